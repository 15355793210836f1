// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Brain commands
//!
//! Commands: register, unregister, list, query, ask, replicant

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use brain_core::application::query_service::{QueryOutcome, QueryRequest, QueryService};
use brain_core::domain::agent_config::{BrainAgentConfigManifest, BrainEntry, LoadedConfig};
use brain_core::domain::chunking::ChunkUnit;
use brain_core::domain::events::QueryEvent;
use brain_core::infrastructure::event_bus::{DomainEvent, EventBusError, EventReceiver};
use brain_core::presentation::query_tool::StructuredAnswer;

use crate::embedded::BrainRuntime;

#[derive(Subcommand)]
pub enum BrainCommand {
    /// Register a directory as a named brain
    Register {
        /// Source directory (relative paths resolve against the data directory)
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        /// Brain name
        #[arg(short, long)]
        name: String,

        /// -1 for one neuron per file, otherwise the chunk size
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        chunk_size: i64,

        /// Chunk unit (chars or lines); defaults to the configured unit
        #[arg(long, value_parser = parse_chunk_unit)]
        chunk_unit: Option<ChunkUnit>,

        /// Do not write the registration to the configuration file
        #[arg(long)]
        no_persist: bool,
    },

    /// Remove a registered brain
    Unregister {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List registered brains
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Query a brain
    Query {
        #[arg(value_name = "BRAIN")]
        brain: String,

        #[arg(value_name = "QUERY")]
        query: String,

        /// Persona id from the catalog
        #[arg(long)]
        persona_id: Option<String>,

        /// Inline persona text (ignored when --persona-id is set)
        #[arg(long)]
        persona: Option<String>,

        #[arg(long)]
        mode_id: Option<String>,

        #[arg(long)]
        mode: Option<String>,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        min_score: Option<f64>,

        /// Print the structured answer as JSON
        #[arg(long)]
        json: bool,

        /// Also print the activated neurons and their scores
        #[arg(short, long)]
        verbose: bool,

        /// Print the query's pipeline events to stderr
        #[arg(long)]
        events: bool,
    },

    /// Pass raw input to QueryBrainTool (e.g. "brain=docs query=...")
    Ask {
        #[arg(value_name = "INPUT")]
        input: String,

        #[arg(long)]
        json: bool,

        /// Print the query's pipeline events to stderr
        #[arg(long)]
        events: bool,
    },

    /// Pass a composite prompt to SynthesizerReplicant
    Replicant {
        #[arg(value_name = "PROMPT")]
        prompt: String,
    },
}

fn parse_chunk_unit(value: &str) -> Result<ChunkUnit, String> {
    match value.to_ascii_lowercase().as_str() {
        "chars" | "char" => Ok(ChunkUnit::Chars),
        "lines" | "line" => Ok(ChunkUnit::Lines),
        other => Err(format!("unknown chunk unit '{}': expected chars or lines", other)),
    }
}

pub async fn handle_command(command: BrainCommand, config: LoadedConfig) -> Result<()> {
    let mut runtime = BrainRuntime::new(config)?;

    match command {
        BrainCommand::Register {
            directory,
            name,
            chunk_size,
            chunk_unit,
            no_persist,
        } => register(&mut runtime, directory, name, chunk_size, chunk_unit, no_persist),
        BrainCommand::Unregister { name } => unregister(&mut runtime, &name),
        BrainCommand::List { json } => list(&runtime, json),
        BrainCommand::Query {
            brain,
            query,
            persona_id,
            persona,
            mode_id,
            mode,
            top_k,
            min_score,
            json,
            verbose,
            events,
        } => {
            let mut receiver = events.then(|| runtime.event_bus().subscribe());
            let request = QueryRequest {
                brain,
                query,
                persona_id,
                persona,
                mode_id,
                mode,
                top_k,
                min_score,
                ..Default::default()
            };
            let result = runtime.service().answer(request).await;
            if let Some(receiver) = receiver.as_mut() {
                print_events(receiver);
            }
            print_outcome(&result?, json, verbose)
        }
        BrainCommand::Ask { input, json, events } => {
            let mut receiver = events.then(|| runtime.event_bus().subscribe());
            let tool = runtime.query_tool();
            let result = if json {
                tool.answer_structured(&input)
                    .await
                    .map(|answer| serde_json::to_string_pretty(&answer))
            } else {
                tool.answer(&input).await.map(Ok)
            };
            if let Some(receiver) = receiver.as_mut() {
                print_events(receiver);
            }
            println!("{}", result??);
            Ok(())
        }
        BrainCommand::Replicant { prompt } => {
            let response = runtime.replicant().run(&prompt).await?;
            println!("{}", response);
            Ok(())
        }
    }
}

fn register(
    runtime: &mut BrainRuntime,
    directory: PathBuf,
    name: String,
    chunk_size: i64,
    chunk_unit: Option<ChunkUnit>,
    no_persist: bool,
) -> Result<()> {
    let entry = BrainEntry {
        name,
        directory,
        chunk_size,
        chunk_unit,
    };
    let chunking = runtime.manifest().spec.chunking_for(&entry)?;
    let brain = runtime
        .registry()
        .register_brain_with(&entry.directory, &entry.name, chunking)
        .with_context(|| format!("Failed to register brain '{}'", entry.name))?;

    println!(
        "{}",
        format!(
            "✓ Registered brain '{}' ({} neurons, {})",
            brain.name,
            brain.len(),
            brain.revision
        )
        .green()
    );

    if !no_persist {
        let path = runtime.persist_brain(entry)?;
        println!("  Saved to {}", path.display().to_string().dimmed());
    }
    Ok(())
}

fn unregister(runtime: &mut BrainRuntime, name: &str) -> Result<()> {
    let removed = runtime.registry().unregister_brain(name);
    let forgotten = runtime.forget_brain(name)?;

    if removed || forgotten.is_some() {
        println!("{}", format!("✓ Unregistered brain '{}'", name).green());
    } else {
        println!("{}", format!("Brain '{}' was not registered", name).yellow());
    }
    Ok(())
}

fn list(runtime: &BrainRuntime, json: bool) -> Result<()> {
    let brains = runtime.registry().list_brains();

    if json {
        println!("{}", serde_json::to_string_pretty(&brains)?);
        return Ok(());
    }

    if brains.is_empty() {
        println!("{}", "No brains registered.".dimmed());
        println!(
            "Register one with: brain register <DIRECTORY> --name <NAME> (config: {})",
            BrainAgentConfigManifest::user_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unknown)".to_string())
        );
        return Ok(());
    }

    println!(
        "{:<20} {:>8} {:>12} {:<6} {}",
        "NAME".bold(),
        "NEURONS".bold(),
        "CHUNKING".bold(),
        "REV".bold(),
        "DIRECTORY".bold()
    );
    for brain in brains {
        let chunking = if brain.chunk_size < 0 {
            "whole file".to_string()
        } else {
            format!("{} {}", brain.chunk_size, brain.chunk_unit)
        };
        println!(
            "{:<20} {:>8} {:>12} {:<6} {}",
            brain.name,
            brain.neuron_count,
            chunking,
            brain.revision.to_string(),
            brain.source_directory.display()
        );
    }
    Ok(())
}

/// Drain the events published so far, one line each on stderr.
fn print_events(receiver: &mut EventReceiver) {
    loop {
        match receiver.try_recv() {
            Ok(DomainEvent::Query(event)) => eprintln!("{}", describe_event(&event).dimmed()),
            Ok(DomainEvent::Brain(_)) | Err(EventBusError::Lagged(_)) => {}
            Err(EventBusError::Empty) | Err(EventBusError::Closed) => break,
        }
    }
}

fn describe_event(event: &QueryEvent) -> String {
    let detail = match event {
        QueryEvent::QueryReceived { brain_name, query, .. } => {
            format!("received for brain '{}': {}", brain_name, query)
        }
        QueryEvent::NeuronsActivated {
            revision,
            scored_count,
            activated_count,
            failed_count,
            duration_ms,
            ..
        } => format!(
            "activated {} of {} neurons at {} ({} failed, {} ms)",
            activated_count, scored_count, revision, failed_count, duration_ms
        ),
        QueryEvent::InstructionSynthesized {
            source_neuron_count,
            cached,
            ..
        } => format!(
            "synthesized from {} neurons{}",
            source_neuron_count,
            if *cached { " (cached)" } else { "" }
        ),
        QueryEvent::QueryFailed { step, reason, .. } => format!("failed during {}: {}", step, reason),
    };
    format!("[{}] {}", event.query_id(), detail)
}

fn print_outcome(outcome: &QueryOutcome, json: bool, verbose: bool) -> Result<()> {
    if json {
        let answer = StructuredAnswer::from(outcome.instruction.clone());
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    if verbose {
        println!(
            "{}",
            format!(
                "Query {} | brain {} ({}) | {} of {} neurons activated{}",
                outcome.query_id,
                outcome.activation.brain_name,
                outcome.activation.brain_revision,
                outcome.activation.activated.len(),
                outcome.activation.scored_count,
                if outcome.cached { " | cached" } else { "" }
            )
            .dimmed()
        );
        for activated in &outcome.activation.activated {
            let line = format!("  {:.2}  {}", activated.score, activated.id());
            match (&activated.failure, &activated.reasoning) {
                (Some(failure), _) => println!("{} {}", line, format!("(failed: {})", failure).red()),
                (None, Some(reasoning)) => println!("{} {}", line, reasoning.dimmed()),
                (None, None) => println!("{}", line),
            }
        }
        println!();
    }

    println!("{}", outcome.instruction.text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_event() {
        let query_id = brain_core::domain::query::QueryId::new();
        let line = describe_event(&QueryEvent::InstructionSynthesized {
            query_id,
            brain_name: "pets".to_string(),
            source_neuron_count: 2,
            cached: true,
            completed_at: chrono::Utc::now(),
        });
        assert_eq!(line, format!("[{}] synthesized from 2 neurons (cached)", query_id));
    }

    #[test]
    fn test_parse_chunk_unit() {
        assert_eq!(parse_chunk_unit("Lines"), Ok(ChunkUnit::Lines));
        assert_eq!(parse_chunk_unit("chars"), Ok(ChunkUnit::Chars));
        assert!(parse_chunk_unit("words").is_err());
    }
}
