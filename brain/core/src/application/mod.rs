// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod registry;
pub mod cognize;
pub mod instruct;
pub mod query_cache;
pub mod query_service;
