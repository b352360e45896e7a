// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Normalized contract events.

use alloy::{primitives::U256, sol_types::SolEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::blockchain::contract::IWallet;
use crate::blockchain::{serialize_display_amount, to_display_unit, EventKind, RawLog};
use crate::error::{WalletError, WalletResult};

/// An allowance was set, increased or reduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowanceChanged {
    pub sender: String,
    pub beneficiary: String,
    #[serde(serialize_with = "serialize_display_amount")]
    pub prev_amount: U256,
    #[serde(serialize_with = "serialize_display_amount")]
    pub new_amount: U256,
    pub timestamp: DateTime<Utc>,
}

/// A beneficiary withdrew from its allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoneySent {
    pub beneficiary: String,
    pub block_number: Option<u64>,
    #[serde(serialize_with = "serialize_display_amount")]
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
}

/// The contract received funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoneyReceived {
    pub sender: String,
    pub block_number: Option<u64>,
    #[serde(serialize_with = "serialize_display_amount")]
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipTransferred {
    pub previous_owner: String,
    pub new_owner: String,
    pub block_number: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// A contract event with checksummed addresses and amounts in ether.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event_type")]
pub enum DomainEvent {
    AllowanceChanged(AllowanceChanged),
    MoneySent(MoneySent),
    MoneyReceived(MoneyReceived),
    OwnershipTransferred(OwnershipTransferred),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::AllowanceChanged(_) => EventKind::AllowanceChanged,
            DomainEvent::MoneySent(_) => EventKind::MoneySent,
            DomainEvent::MoneyReceived(_) => EventKind::MoneyReceived,
            DomainEvent::OwnershipTransferred(_) => EventKind::OwnershipTransferred,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Decode a raw log of `kind`, stamping it with `captured_at`.
    pub fn normalize(
        kind: EventKind,
        log: &RawLog,
        captured_at: DateTime<Utc>,
    ) -> WalletResult<Self> {
        let invalid = |e: alloy::sol_types::Error| WalletError::Normalization {
            kind,
            reason: e.to_string(),
        };

        let event = match kind {
            EventKind::AllowanceChanged => {
                let decoded =
                    IWallet::AllowanceChanged::decode_log_data(&log.data).map_err(invalid)?;
                DomainEvent::AllowanceChanged(AllowanceChanged {
                    sender: decoded.sender.to_checksum(None),
                    beneficiary: decoded.beneficiary.to_checksum(None),
                    prev_amount: to_display_unit(decoded.prevAmount),
                    new_amount: to_display_unit(decoded.newAmount),
                    timestamp: captured_at,
                })
            }
            EventKind::MoneySent => {
                let decoded = IWallet::MoneySent::decode_log_data(&log.data).map_err(invalid)?;
                DomainEvent::MoneySent(MoneySent {
                    beneficiary: decoded.beneficiary.to_checksum(None),
                    block_number: log.block_number,
                    amount: to_display_unit(decoded.amount),
                    timestamp: captured_at,
                })
            }
            EventKind::MoneyReceived => {
                let decoded =
                    IWallet::MoneyReceived::decode_log_data(&log.data).map_err(invalid)?;
                DomainEvent::MoneyReceived(MoneyReceived {
                    sender: decoded.from.to_checksum(None),
                    block_number: log.block_number,
                    amount: to_display_unit(decoded.amount),
                    timestamp: captured_at,
                })
            }
            EventKind::OwnershipTransferred => {
                let decoded =
                    IWallet::OwnershipTransferred::decode_log_data(&log.data).map_err(invalid)?;
                DomainEvent::OwnershipTransferred(OwnershipTransferred {
                    previous_owner: decoded.previousOwner.to_checksum(None),
                    new_owner: decoded.newOwner.to_checksum(None),
                    block_number: log.block_number,
                    timestamp: captured_at,
                })
            }
        };

        Ok(event)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::blockchain::testing::{BENEFICIARY, OWNER};
    use crate::blockchain::WEI_PER_ETHER;
    use alloy::primitives::Address;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn beneficiary() -> Address {
        Address::from_str(BENEFICIARY).unwrap()
    }

    #[test]
    fn allowance_changed_is_converted_to_ether() {
        let log = allowance_changed(OWNER, beneficiary(), WEI_PER_ETHER, U256::from(2u64) * WEI_PER_ETHER);
        let event = DomainEvent::normalize(EventKind::AllowanceChanged, &log, captured()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&event.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["event_type"], "AllowanceChanged");
        assert_eq!(json["sender"], OWNER.to_checksum(None));
        assert_eq!(json["beneficiary"], BENEFICIARY);
        assert_eq!(json["prev_amount"], 1);
        assert_eq!(json["new_amount"], 2);
        assert_eq!(json["timestamp"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn money_events_carry_block_number() {
        let sent = DomainEvent::normalize(
            EventKind::MoneySent,
            &money_sent(beneficiary(), U256::from(3u64) * WEI_PER_ETHER),
            captured(),
        )
        .unwrap();
        assert_eq!(
            sent,
            DomainEvent::MoneySent(MoneySent {
                beneficiary: BENEFICIARY.to_string(),
                block_number: Some(11),
                amount: U256::from(3u64),
                timestamp: captured(),
            })
        );

        let received = DomainEvent::normalize(
            EventKind::MoneyReceived,
            &money_received(OWNER, WEI_PER_ETHER / U256::from(2u64)),
            captured(),
        )
        .unwrap();
        let json = serde_json::to_value(&received).unwrap();
        assert_eq!(json["event_type"], "MoneyReceived");
        assert_eq!(json["block_number"], 12);
        // half an ether truncates to zero
        assert_eq!(json["amount"], 0);
    }

    #[test]
    fn ownership_transferred_uses_checksummed_addresses() {
        let event = DomainEvent::normalize(
            EventKind::OwnershipTransferred,
            &ownership_transferred(OWNER, beneficiary()),
            captured(),
        )
        .unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["previous_owner"], OWNER.to_checksum(None));
        assert_eq!(json["new_owner"], BENEFICIARY);
        assert_eq!(event.kind(), EventKind::OwnershipTransferred);
    }

    #[test]
    fn mismatched_log_is_a_normalization_error() {
        let err = DomainEvent::normalize(EventKind::MoneySent, &garbage(), captured()).unwrap_err();
        assert!(matches!(
            err,
            WalletError::Normalization {
                kind: EventKind::MoneySent,
                ..
            }
        ));

        // a valid log of the wrong kind does not decode either
        let log = ownership_transferred(OWNER, beneficiary());
        assert!(DomainEvent::normalize(EventKind::AllowanceChanged, &log, captured()).is_err());
    }
}
