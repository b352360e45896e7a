// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for wallet commands and the event monitor.
//!
//! Validation errors are raised before any network I/O. Network and
//! contract failures keep the name of the operation that produced them so a
//! single error line is enough to locate the failing step.

use std::time::Duration;

use crate::blockchain::{ClientError, EventKind};
use crate::config::ConfigError;

/// Errors returned by the transaction pipeline and the event monitor.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid contract address: {0}")]
    InvalidContractAddress(String),

    #[error("invalid {kind} action: {action}")]
    InvalidAction { kind: &'static str, action: String },

    #[error("amount should be a positive value")]
    InvalidAmount,

    #[error("failed to {operation}: {source}")]
    Client {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    /// The node rejected the transaction before it was accepted.
    #[error(transparent)]
    SubmissionFailed(ClientError),

    /// The transaction was mined but reverted.
    #[error("receipt status unsuccessful (tx {tx_hash})")]
    ReceiptUnsuccessful { tx_hash: String },

    #[error("{kind} subscription failed: {source}")]
    Subscription {
        kind: EventKind,
        #[source]
        source: ClientError,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A watcher task ended without reporting a result.
    #[error("event watcher failed: {0}")]
    Watcher(String),

    /// Confined to a single event; watchers log it and keep listening.
    #[error("failed to normalize {kind} event: {reason}")]
    Normalization { kind: EventKind, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WalletError {
    /// Wrap a client error with the name of the failing operation.
    pub fn client(operation: &'static str) -> impl FnOnce(ClientError) -> Self {
        move |source| Self::Client { operation, source }
    }

    /// True for errors detected from caller input alone.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey(_)
                | Self::InvalidAddress(_)
                | Self::InvalidAction { .. }
                | Self::InvalidAmount
                | Self::Config(_)
        )
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_carry_operation_name() {
        let err = WalletError::client("get pending nonce")(ClientError::Rpc("boom".into()));
        assert_eq!(err.to_string(), "failed to get pending nonce: RPC error: boom");
    }

    #[test]
    fn receipt_failure_message_is_distinct_from_submission() {
        let reverted = WalletError::ReceiptUnsuccessful {
            tx_hash: "0xabc".into(),
        };
        assert!(reverted.to_string().starts_with("receipt status unsuccessful"));

        let rejected = WalletError::SubmissionFailed(ClientError::Transaction(
            "insufficient funds".into(),
        ));
        assert_eq!(rejected.to_string(), "Transaction failed: insufficient funds");
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(WalletError::InvalidAmount.is_input_error());
        assert!(WalletError::from(ConfigError::Missing("blockchain.timeout")).is_input_error());
        assert!(WalletError::InvalidAction {
            kind: "allowance",
            action: "drop".into()
        }
        .is_input_error());
        assert!(!WalletError::Timeout {
            operation: "wait mined",
            after: Duration::from_secs(1)
        }
        .is_input_error());
    }
}
