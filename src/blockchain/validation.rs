// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address format and contract deployment checks.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use super::client::ContractClient;
use super::transactions::with_deadline;
use super::types::ContractBinding;
use crate::error::{WalletError, WalletResult};

/// Length of `0x` + 40 hex digits.
const ADDRESS_LEN: usize = 42;

/// Check that `address` is `0x` followed by exactly 40 hex digits.
///
/// Pure format check: deployment status and checksum casing are not inspected.
pub fn validate_address_format(address: &str) -> WalletResult<()> {
    let well_formed = address.len() == ADDRESS_LEN
        && address.starts_with("0x")
        && address[2..].bytes().all(|b| b.is_ascii_hexdigit());

    if well_formed {
        Ok(())
    } else {
        Err(WalletError::InvalidAddress(address.to_string()))
    }
}

/// Format-check and parse an address.
pub fn parse_address(address: &str) -> WalletResult<Address> {
    validate_address_format(address)?;
    Address::from_str(address).map_err(|_| WalletError::InvalidAddress(address.to_string()))
}

/// Check that a contract is deployed at `address`.
///
/// Runs the format check first, then reads the code at the address.
pub async fn validate_contract_deployed<C: ContractClient + ?Sized>(
    client: &C,
    address: &str,
    timeout: Duration,
) -> WalletResult<Address> {
    let parsed = parse_address(address)?;

    let bytecode = with_deadline("get contract code", timeout, client.code_at(parsed)).await?;
    if bytecode.is_empty() {
        return Err(WalletError::InvalidContractAddress(address.to_string()));
    }

    Ok(parsed)
}

/// Validate `address` and bind to the contract deployed there.
pub async fn bind_contract<C: ContractClient + ?Sized>(
    client: &C,
    address: &str,
    timeout: Duration,
) -> WalletResult<ContractBinding> {
    let parsed = validate_contract_deployed(client, address, timeout).await?;
    Ok(ContractBinding::new(parsed))
}
