// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Brain Agent Core
//!
//! Organizes document collections into brains of neurons, activates the
//! neurons relevant to a query and synthesizes one instruction from them.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Registry, Cognize and Instruct pipeline plus its facades

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
