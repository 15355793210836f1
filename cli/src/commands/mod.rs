// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the brain CLI

pub mod brain;
pub mod config;

pub use self::brain::BrainCommand;
pub use self::config::ConfigCommand;
