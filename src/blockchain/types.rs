// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::fmt;

use alloy::primitives::{Address, LogData, TxHash, U256};
use serde::Serialize;
use tokio::sync::mpsc;

use super::client::ClientError;

/// Decimals of the network's display unit (ether).
pub const DISPLAY_DECIMALS: u8 = 18;

/// Number of wei in one ether.
pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Capacity of the per-subscription delivery channel.
pub const SUBSCRIPTION_BUFFER: usize = 64;

/// Handle to a wallet contract whose bytecode was found on chain.
///
/// Only [`super::validation::bind_contract`] creates bindings, so holding one
/// means the address passed the format and deployment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractBinding {
    address: Address,
}

impl ContractBinding {
    pub(crate) fn new(address: Address) -> Self {
        Self { address }
    }

    /// Address of the bound contract.
    pub fn address(&self) -> Address {
        self.address
    }
}

/// Contract events the monitor subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    AllowanceChanged,
    MoneySent,
    MoneyReceived,
    OwnershipTransferred,
}

impl EventKind {
    /// Every kind, in subscription order.
    pub const ALL: [EventKind; 4] = [
        EventKind::AllowanceChanged,
        EventKind::MoneySent,
        EventKind::MoneyReceived,
        EventKind::OwnershipTransferred,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AllowanceChanged => "AllowanceChanged",
            EventKind::MoneySent => "MoneySent",
            EventKind::MoneyReceived => "MoneyReceived",
            EventKind::OwnershipTransferred => "OwnershipTransferred",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
    /// Address of the created contract, for deployments
    pub contract_address: Option<Address>,
}

/// A log delivered by a subscription, still ABI encoded.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub data: LogData,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
}

/// Live feed of one event kind.
///
/// The unsubscribe action runs once, when the subscription is dropped.
pub struct Subscription {
    kind: EventKind,
    pub events: mpsc::Receiver<RawLog>,
    pub errors: mpsc::Receiver<ClientError>,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        kind: EventKind,
        events: mpsc::Receiver<RawLog>,
        errors: mpsc::Receiver<ClientError>,
        unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            kind,
            events,
            errors,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("released", &self.unsubscribe.is_none())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn wei_per_ether_is_ten_to_the_eighteen() {
        assert_eq!(WEI_PER_ETHER, U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn event_kind_names_match_contract_events() {
        let names: Vec<_> = EventKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            ["AllowanceChanged", "MoneySent", "MoneyReceived", "OwnershipTransferred"]
        );
    }

    #[test]
    fn dropping_subscription_unsubscribes_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let (_event_tx, events) = mpsc::channel(1);
        let (_error_tx, errors) = mpsc::channel(1);
        let counter = released.clone();
        let sub = Subscription::new(EventKind::MoneySent, events, errors, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(sub.kind(), EventKind::MoneySent);
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
