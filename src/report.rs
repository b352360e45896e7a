// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reporting hook for confirmed transactions and observed events.

use crate::blockchain::{format_amount, TxReceipt, DISPLAY_DECIMALS};
use crate::monitor::DomainEvent;

/// Receives the outcomes the operator should see.
pub trait Reporter: Send + Sync {
    /// A transaction was mined with a successful status.
    fn transaction_processed(&self, operation: &str, receipt: &TxReceipt);

    /// A contract event was received and normalized.
    fn event(&self, event: &DomainEvent);
}

/// Logs through `tracing` and prints events as pretty JSON on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn transaction_processed(&self, operation: &str, receipt: &TxReceipt) {
        tracing::info!(
            operation,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction processed"
        );
    }

    fn event(&self, event: &DomainEvent) {
        match event.to_json_pretty() {
            Ok(rendered) => {
                tracing::debug!(event_type = %event.kind(), "Event received");
                println!("{rendered}");
            }
            Err(e) => {
                tracing::warn!(event_type = %event.kind(), error = %e, "Failed to render event");
            }
        }
    }
}

/// Human-readable amount of a deployment or transfer, for log lines.
pub fn display_wei(wei: alloy::primitives::U256) -> String {
    format!("{} ETH", format_amount(wei, DISPLAY_DECIMALS))
}
