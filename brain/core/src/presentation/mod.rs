// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presentation Layer
//!
//! Facades that accept loosely formatted text from tools and agents, parse it
//! into a [`QueryRequest`](crate::application::query_service::QueryRequest)
//! and delegate to a single [`QueryService`](crate::application::query_service::QueryService).
//! Facades hold no selection or synthesis logic of their own.

pub mod request_parser;
pub mod query_tool;
pub mod replicant;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::query_service::QueryError;
use request_parser::RequestError;

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Query failed during {}: {source}", .source.step())]
    Query {
        #[from]
        source: QueryError,
    },
}

/// Text-in, text-out entry point shared by the query tool and the replicant.
#[async_trait]
pub trait QueryFacade: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, input: &str) -> Result<String, FacadeError>;
}
