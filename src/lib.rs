// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Allowance Wallet - operator tooling for the allowance wallet contract
//!
//! The contract holds funds for beneficiaries, each limited by an allowance
//! the owner sets. This crate manages allowances and ownership, deploys the
//! contract and streams its events.
//!
//! ## Modules
//!
//! - `blockchain` - Contract client, signing and the transaction pipeline
//! - `monitor` - Concurrent event watchers with fail-fast cancellation
//! - `report` - Where confirmed transactions and events are reported
//! - `deploy` - Contract deployment
//! - `config` - YAML, environment and flag configuration
//! - `logging` - Tracing subscriber setup

pub mod blockchain;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod report;

pub use error::{WalletError, WalletResult};
