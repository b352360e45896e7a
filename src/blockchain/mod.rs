// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for the allowance wallet contract.
//!
//! This module provides functionality for:
//! - Address and deployment validation
//! - Wei/ether conversion
//! - Transaction signing, submission and confirmation
//! - Event subscriptions through [`ContractClient`]

pub mod client;
pub mod contract;
pub mod signing;
pub mod transactions;
pub mod types;
pub mod units;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientError, ContractClient, EvmClient};
pub use contract::{ContractCall, IWallet};
pub use signing::{build_signer, parse_signer, SigningContext};
pub use transactions::{
    run_allowance, run_owner, with_deadline, AllowanceAction, AllowanceRunner, CommandOutput,
    OwnerRunner, OwnershipAction, RunnerConfig, TransactionExecutor,
};
pub use types::*;
pub use units::{format_amount, serialize_display_amount, to_display_unit, to_smallest_unit};
pub use validation::{bind_contract, parse_address, validate_address_format, validate_contract_deployed};
