// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI LLM Provider Adapter
//
// Chat Completions API; also used for OpenAI-compatible servers
// (LM Studio, vLLM, LiteLLM).

use crate::domain::llm::{
    FinishReason, GenerationOptions, GenerationResponse, LLMError, LLMProvider, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAIAdapter {
    client: reqwest::Client,
    provider_name: String,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAIAdapter {
    pub fn new(provider_name: impl Into<String>, endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_name: provider_name.into(),
            endpoint,
            api_key,
            model,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIAdapter {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &options.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(prompt.to_string()),
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .authorized(self.client.post(self.url("chat/completions")))
            .json(&request)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 401 || status == 403 {
                LLMError::Authentication(error_text)
            } else if status == 429 {
                LLMError::RateLimit
            } else if status == 404 {
                LLMError::ModelNotFound(self.model.clone())
            } else if status.is_server_error() {
                LLMError::Network(format!("HTTP {}: {}", status, error_text))
            } else {
                LLMError::Provider(format!("HTTP {}: {}", status, error_text))
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::InvalidResponse("No choices in response".into()))?;

        let usage = chat
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(GenerationResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
            provider: self.provider_name.clone(),
            model: self.model.clone(),
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let response = self
            .authorized(self.client.get(self.url("models")))
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status() == 401 || response.status() == 403 {
            Err(LLMError::Authentication("Invalid API key".into()))
        } else {
            Err(LLMError::Network(format!("HTTP {}", response.status())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_generate_sends_system_prompt_and_parses_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "judge"},
                    {"role": "user", "content": "Query: cats"}
                ],
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"{\"related_to\":true}"},"finish_reason":"stop"}],
                    "usage":{"prompt_tokens":10,"completion_tokens":4,"total_tokens":14}}"#,
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new(
            "openai",
            format!("{}/v1", server.url()),
            "sk-test".to_string(),
            "gpt-4o-mini".to_string(),
        );
        let options = GenerationOptions::default().with_system_prompt("judge").json();
        let response = adapter.generate("Query: cats", &options).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.text, r#"{"related_to":true}"#);
        assert_eq!(response.usage.total_tokens, 14);
        assert_eq!(response.provider, "openai");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new("openai", server.url(), String::new(), "m".to_string());
        let err = adapter
            .generate("hi", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::RateLimit));
    }

    #[tokio::test]
    async fn test_health_check_rejects_bad_key() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/models").with_status(401).create_async().await;

        let adapter = OpenAIAdapter::new("openai", server.url(), "bad".to_string(), "m".to_string());
        assert!(matches!(
            adapter.health_check().await,
            Err(LLMError::Authentication(_))
        ));
    }
}
