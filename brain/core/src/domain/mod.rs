// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Neurons, brains, activation and instruction value objects, the capability
//! ports and the configuration manifest.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer

pub mod neuron;
pub mod chunking;
pub mod brain;
pub mod activation;
pub mod instruction;
pub mod capability;
pub mod persona;
pub mod query;
pub mod events;
pub mod llm;
pub mod agent_config;
