// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod brain_loader;
pub mod event_bus;
pub mod llm;
pub mod scoring;
pub mod generation;
