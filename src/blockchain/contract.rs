// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Allowance wallet contract interface.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol,
    sol_types::{SolCall, SolEvent},
};

use super::types::EventKind;

// Define the wallet interface using alloy's sol! macro
sol! {
    interface IWallet {
        event AllowanceChanged(address indexed sender, address indexed beneficiary, uint256 prevAmount, uint256 newAmount);
        event MoneySent(address indexed beneficiary, uint256 amount);
        event MoneyReceived(address indexed from, uint256 amount);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);

        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;
        function allowance(address beneficiary) external view returns (uint256);
        function setAllowance(address beneficiary, uint256 amount) external;
        function increaseAllowance(address beneficiary, uint256 amount) external;
        function reduceAllowance(address beneficiary, uint256 amount) external;
    }
}

/// A contract method together with its arguments.
///
/// Amounts are always in wei.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    Owner,
    Allowance { beneficiary: Address },
    SetAllowance { beneficiary: Address, amount: U256 },
    IncreaseAllowance { beneficiary: Address, amount: U256 },
    ReduceAllowance { beneficiary: Address, amount: U256 },
    TransferOwnership { new_owner: Address },
}

impl ContractCall {
    /// Solidity method name.
    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::Owner => "owner",
            ContractCall::Allowance { .. } => "allowance",
            ContractCall::SetAllowance { .. } => "setAllowance",
            ContractCall::IncreaseAllowance { .. } => "increaseAllowance",
            ContractCall::ReduceAllowance { .. } => "reduceAllowance",
            ContractCall::TransferOwnership { .. } => "transferOwnership",
        }
    }

    /// ABI-encoded calldata.
    pub fn calldata(&self) -> Bytes {
        let data = match self {
            ContractCall::Owner => IWallet::ownerCall {}.abi_encode(),
            ContractCall::Allowance { beneficiary } => IWallet::allowanceCall {
                beneficiary: *beneficiary,
            }
            .abi_encode(),
            ContractCall::SetAllowance {
                beneficiary,
                amount,
            } => IWallet::setAllowanceCall {
                beneficiary: *beneficiary,
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::IncreaseAllowance {
                beneficiary,
                amount,
            } => IWallet::increaseAllowanceCall {
                beneficiary: *beneficiary,
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::ReduceAllowance {
                beneficiary,
                amount,
            } => IWallet::reduceAllowanceCall {
                beneficiary: *beneficiary,
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::TransferOwnership { new_owner } => IWallet::transferOwnershipCall {
                newOwner: *new_owner,
            }
            .abi_encode(),
        };
        data.into()
    }
}

/// Topic0 of the given event kind.
pub fn event_signature(kind: EventKind) -> B256 {
    match kind {
        EventKind::AllowanceChanged => IWallet::AllowanceChanged::SIGNATURE_HASH,
        EventKind::MoneySent => IWallet::MoneySent::SIGNATURE_HASH,
        EventKind::MoneyReceived => IWallet::MoneyReceived::SIGNATURE_HASH,
        EventKind::OwnershipTransferred => IWallet::OwnershipTransferred::SIGNATURE_HASH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, keccak256};

    #[test]
    fn event_signatures_match_solidity_declarations() {
        assert_eq!(
            event_signature(EventKind::AllowanceChanged),
            keccak256("AllowanceChanged(address,address,uint256,uint256)")
        );
        assert_eq!(
            event_signature(EventKind::MoneySent),
            keccak256("MoneySent(address,uint256)")
        );
        assert_eq!(
            event_signature(EventKind::OwnershipTransferred),
            keccak256("OwnershipTransferred(address,address)")
        );
    }

    #[test]
    fn calldata_starts_with_method_selector() {
        let beneficiary = address!("0x1111111111111111111111111111111111111111");
        let call = ContractCall::SetAllowance {
            beneficiary,
            amount: U256::from(5u64),
        };
        let data = call.calldata();
        assert_eq!(&data[..4], &keccak256("setAllowance(address,uint256)")[..4]);
        assert_eq!(data.len(), 4 + 32 * 2);
    }

    #[test]
    fn method_names_match_the_abi() {
        let beneficiary = Address::ZERO;
        assert_eq!(ContractCall::Owner.method(), "owner");
        assert_eq!(ContractCall::Allowance { beneficiary }.method(), "allowance");
        assert_eq!(
            ContractCall::ReduceAllowance {
                beneficiary,
                amount: U256::ZERO
            }
            .method(),
            "reduceAllowance"
        );
    }
}
