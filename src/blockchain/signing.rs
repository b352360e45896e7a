// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing context.
//!
//! A [`SigningContext`] bundles the operator key with the nonce, chain id and
//! gas price fetched for one transaction. It is built fresh for every
//! transaction and never reused, so the nonce always reflects the pending
//! state of the account.

use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
};
use k256::SecretKey;

use super::client::ContractClient;
use super::transactions::with_deadline;
use crate::error::{WalletError, WalletResult};

/// Everything needed to sign one transaction.
#[derive(Clone)]
pub struct SigningContext {
    signer: PrivateKeySigner,
    nonce: u64,
    chain_id: u64,
    gas_price: u128,
    value: U256,
    /// 0 means "estimate automatically"
    gas_limit: u64,
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("account", &self.signer.address())
            .field("nonce", &self.nonce)
            .field("chain_id", &self.chain_id)
            .field("gas_price", &self.gas_price)
            .field("value", &self.value)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

impl SigningContext {
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn gas_price(&self) -> u128 {
        self.gas_price
    }

    /// Wei attached to value-bearing transactions (deployments).
    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
}

/// Build a signing context for the next transaction of the key's account.
///
/// Each network step runs under `timeout` and any failure aborts the build;
/// a partially filled context is never returned.
pub async fn build_signer<C: ContractClient + ?Sized>(
    client: &C,
    key_material: &str,
    value: U256,
    timeout: Duration,
) -> WalletResult<SigningContext> {
    let signer = parse_signer(key_material)?;
    let account = signer.address();

    let nonce = with_deadline("get pending nonce", timeout, client.pending_nonce(account)).await?;
    let chain_id = with_deadline("get chain ID", timeout, client.chain_id()).await?;
    let gas_price = with_deadline(
        "get suggested gas price",
        timeout,
        client.suggest_gas_price(),
    )
    .await?;

    tracing::debug!(%account, nonce, chain_id, gas_price, "Signer ready");

    Ok(SigningContext {
        signer,
        nonce,
        chain_id,
        gas_price,
        value,
        gas_limit: 0,
    })
}

/// Parse operator key material.
///
/// Accepts a 64-digit hex key (with or without `0x`) or a PEM-encoded
/// secp256k1 key in SEC1 or PKCS#8 form.
pub fn parse_signer(key_material: &str) -> WalletResult<PrivateKeySigner> {
    let trimmed = key_material.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidKey("no private key configured".to_string()));
    }

    let hex_key = if trimmed.starts_with("-----BEGIN") {
        pem_to_hex(trimmed.as_bytes())?
    } else {
        trimmed.trim_start_matches("0x").to_string()
    };

    let key_bytes =
        alloy::hex::decode(&hex_key).map_err(|e| WalletError::InvalidKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))
}

/// Parse a private key from PEM format to hex string.
///
/// # Returns
/// * `Ok(String)` - Hex-encoded private key (64 characters, no 0x prefix)
/// * `Err(WalletError::InvalidKey)` - If PEM parsing fails
pub fn pem_to_hex(pem_bytes: &[u8]) -> WalletResult<String> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| WalletError::InvalidKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| WalletError::InvalidKey(format!("Invalid PEM: {}", e)))?;

    // SEC1 first, PKCS#8 as fallback
    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| WalletError::InvalidKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}
