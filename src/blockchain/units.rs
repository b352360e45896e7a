// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between wei and ether.
//!
//! Amounts stay in wei inside the crate and are converted only when read
//! from the operator or shown to them. `to_display_unit` truncates, so
//! `to_smallest_unit(to_display_unit(x)) == x` holds only for whole-ether
//! amounts.

use alloy::primitives::U256;
use serde::Serializer;

use super::types::WEI_PER_ETHER;

/// Ether to wei. Saturates at `U256::MAX`.
pub fn to_smallest_unit(ether: U256) -> U256 {
    ether.saturating_mul(WEI_PER_ETHER)
}

/// Wei to whole ether, truncating any fractional part.
pub fn to_display_unit(wei: U256) -> U256 {
    wei / WEI_PER_ETHER
}

/// Format wei (or token units) to human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Serialize a display amount as a JSON number, or as a decimal string when
/// it does not fit in `u128`.
pub fn serialize_display_amount<S: Serializer>(
    amount: &U256,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match u128::try_from(*amount) {
        Ok(small) => serializer.serialize_u128(small),
        Err(_) => serializer.serialize_str(&amount.to_string()),
    }
}
