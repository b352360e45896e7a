// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction pipeline for the wallet contract.
//!
//! Every write goes through the same steps: bind the contract, build a fresh
//! signer, submit, wait for the receipt and check its status. Reads skip the
//! signer and return values in ether.
//!
//! Nothing here retries. A rejected submission, a reverted receipt and an
//! elapsed deadline are all terminal for the invocation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use alloy::{
    primitives::{Address, TxHash, U256},
    sol_types::SolCall,
};

use super::client::{ClientError, ContractClient};
use super::contract::{ContractCall, IWallet};
use super::signing::build_signer;
use super::types::{ContractBinding, TxReceipt};
use super::units::{to_display_unit, to_smallest_unit};
use super::validation::{bind_contract, parse_address};
use crate::error::{WalletError, WalletResult};
use crate::report::Reporter;

/// Run a client call under a deadline, naming the operation in errors.
pub async fn with_deadline<T, F>(operation: &'static str, timeout: Duration, fut: F) -> WalletResult<T>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(WalletError::client(operation)),
        Err(_) => Err(WalletError::Timeout {
            operation,
            after: timeout,
        }),
    }
}

/// Settings shared by every command invocation.
#[derive(Clone)]
pub struct RunnerConfig {
    /// Operator key material (hex or PEM)
    pub private_key: String,
    /// Wallet contract address
    pub contract_address: String,
    /// Wei attached to value-bearing transactions
    pub default_value: U256,
    /// Deadline applied to each network operation
    pub timeout: Duration,
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("default_value", &self.default_value)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Allowance actions accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceAction {
    Set,
    Get,
    Increase,
    Reduce,
}

impl AllowanceAction {
    /// Parse a case-sensitive action name.
    pub fn parse(action: &str) -> WalletResult<Self> {
        match action {
            "set" => Ok(Self::Set),
            "get" => Ok(Self::Get),
            "increase" => Ok(Self::Increase),
            "reduce" => Ok(Self::Reduce),
            other => Err(WalletError::InvalidAction {
                kind: "allowance",
                action: other.to_string(),
            }),
        }
    }

    /// Operation name reported for successful mutations.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Set => "set_allowance",
            Self::Get => "get_allowance",
            Self::Increase => "increase_allowance",
            Self::Reduce => "reduce_allowance",
        }
    }

    fn contract_call(&self, beneficiary: Address, amount: U256) -> Option<ContractCall> {
        match self {
            Self::Set => Some(ContractCall::SetAllowance {
                beneficiary,
                amount,
            }),
            Self::Increase => Some(ContractCall::IncreaseAllowance {
                beneficiary,
                amount,
            }),
            Self::Reduce => Some(ContractCall::ReduceAllowance {
                beneficiary,
                amount,
            }),
            Self::Get => None,
        }
    }
}

/// Ownership actions accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipAction {
    Transfer,
    Get,
}

impl OwnershipAction {
    /// Parse a case-sensitive action name.
    pub fn parse(action: &str) -> WalletResult<Self> {
        match action {
            "transfer" => Ok(Self::Transfer),
            "get" => Ok(Self::Get),
            other => Err(WalletError::InvalidAction {
                kind: "ownership",
                action: other.to_string(),
            }),
        }
    }
}

/// Check a mutating amount (in ether) and convert it to wei.
pub fn validate_amount(amount: i64) -> WalletResult<U256> {
    if amount <= 0 {
        return Err(WalletError::InvalidAmount);
    }
    Ok(to_smallest_unit(U256::from(amount as u64)))
}

/// Result of a wallet command, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Allowance { beneficiary: String, amount: U256 },
    Owner { address: String },
    Transaction {
        operation: &'static str,
        tx_hash: TxHash,
        block_number: u64,
    },
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::Allowance {
                beneficiary,
                amount,
            } => write!(f, "Current allowance for address {beneficiary} is {amount}"),
            CommandOutput::Owner { address } => write!(f, "Current contract owner is {address}"),
            CommandOutput::Transaction {
                operation,
                tx_hash,
                block_number,
            } => write!(f, "{operation} confirmed in block {block_number} (tx {tx_hash})"),
        }
    }
}

/// Submit-and-confirm pipeline over a [`ContractClient`].
pub struct TransactionExecutor<'a, C: ?Sized> {
    client: &'a C,
    config: &'a RunnerConfig,
    reporter: &'a dyn Reporter,
}

impl<'a, C: ContractClient + ?Sized> TransactionExecutor<'a, C> {
    pub fn new(client: &'a C, config: &'a RunnerConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            client,
            config,
            reporter,
        }
    }

    /// Validate the configured contract address and bind to it.
    pub async fn bind(&self) -> WalletResult<ContractBinding> {
        bind_contract(self.client, &self.config.contract_address, self.config.timeout).await
    }

    /// Read-only call against the latest block; `decode` turns the raw
    /// return data into a value.
    pub async fn read<T>(
        &self,
        operation: &'static str,
        call: ContractCall,
        decode: impl FnOnce(&[u8]) -> Result<T, alloy::sol_types::Error>,
    ) -> WalletResult<T> {
        let binding = self.bind().await?;
        let raw = with_deadline(operation, self.config.timeout, self.client.call(&binding, &call))
            .await?;

        decode(raw.as_ref()).map_err(|e| WalletError::Client {
            operation,
            source: ClientError::Contract(format!("{}: {}", call.method(), e)),
        })
    }

    /// Run a state-changing call through the full pipeline.
    pub async fn execute(
        &self,
        operation: &'static str,
        call: ContractCall,
    ) -> WalletResult<TxReceipt> {
        let timeout = self.config.timeout;
        let binding = self.bind().await?;
        let signer = build_signer(
            self.client,
            &self.config.private_key,
            self.config.default_value,
            timeout,
        )
        .await?;

        let tx_hash = match tokio::time::timeout(
            timeout,
            self.client.submit(&signer, &binding, &call),
        )
        .await
        {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => return Err(WalletError::SubmissionFailed(e)),
            Err(_) => {
                return Err(WalletError::Timeout {
                    operation: "submit transaction",
                    after: timeout,
                })
            }
        };

        tracing::info!(
            operation,
            method = call.method(),
            tx_hash = %tx_hash,
            nonce = signer.nonce(),
            "Transaction submitted, waiting to be mined"
        );

        let receipt = with_deadline("wait mined", timeout, self.client.wait_mined(tx_hash)).await?;

        if !receipt.success {
            tracing::warn!(
                operation,
                tx_hash = %tx_hash,
                block_number = receipt.block_number,
                "Transaction reverted"
            );
            return Err(WalletError::ReceiptUnsuccessful {
                tx_hash: tx_hash.to_string(),
            });
        }

        self.reporter.transaction_processed(operation, &receipt);
        Ok(receipt)
    }
}

/// Allowance reads and mutations.
pub struct AllowanceRunner<'a, C: ?Sized> {
    executor: TransactionExecutor<'a, C>,
}

impl<'a, C: ContractClient + ?Sized> AllowanceRunner<'a, C> {
    pub fn new(client: &'a C, config: &'a RunnerConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            executor: TransactionExecutor::new(client, config, reporter),
        }
    }

    /// Parse, validate and dispatch an allowance command.
    ///
    /// Unknown actions, malformed targets and non-positive amounts are
    /// rejected before any network call.
    pub async fn run(&self, action: &str, target: &str, amount: i64) -> WalletResult<CommandOutput> {
        let action = AllowanceAction::parse(action)?;
        let beneficiary = parse_address(target)?;

        if action == AllowanceAction::Get {
            let amount = self.get_allowance(beneficiary).await?;
            return Ok(CommandOutput::Allowance {
                beneficiary: target.to_string(),
                amount,
            });
        }

        let receipt = self.change_allowance(action, beneficiary, amount).await?;
        Ok(CommandOutput::Transaction {
            operation: action.operation(),
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
        })
    }

    /// Current allowance of `beneficiary`, in ether.
    pub async fn get_allowance(&self, beneficiary: Address) -> WalletResult<U256> {
        let wei = self
            .executor
            .read(
                "get allowance",
                ContractCall::Allowance { beneficiary },
                |data| IWallet::allowanceCall::abi_decode_returns(data),
            )
            .await?;
        Ok(to_display_unit(wei))
    }

    /// Set, increase or reduce the allowance of `beneficiary` by `amount` ether.
    pub async fn change_allowance(
        &self,
        action: AllowanceAction,
        beneficiary: Address,
        amount: i64,
    ) -> WalletResult<TxReceipt> {
        let wei = validate_amount(amount)?;
        let call = action
            .contract_call(beneficiary, wei)
            .ok_or_else(|| WalletError::InvalidAction {
                kind: "allowance",
                action: "get".to_string(),
            })?;

        self.executor.execute(action.operation(), call).await
    }
}

/// Ownership reads and transfers.
pub struct OwnerRunner<'a, C: ?Sized> {
    executor: TransactionExecutor<'a, C>,
}

impl<'a, C: ContractClient + ?Sized> OwnerRunner<'a, C> {
    pub fn new(client: &'a C, config: &'a RunnerConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            executor: TransactionExecutor::new(client, config, reporter),
        }
    }

    /// Parse, validate and dispatch an ownership command.
    pub async fn run(&self, action: &str, target: Option<&str>) -> WalletResult<CommandOutput> {
        match OwnershipAction::parse(action)? {
            OwnershipAction::Get => Ok(CommandOutput::Owner {
                address: self.get_owner().await?,
            }),
            OwnershipAction::Transfer => {
                let new_owner = parse_address(target.unwrap_or_default())?;
                let receipt = self.transfer_ownership(new_owner).await?;
                Ok(CommandOutput::Transaction {
                    operation: "transfer_ownership",
                    tx_hash: receipt.tx_hash,
                    block_number: receipt.block_number,
                })
            }
        }
    }

    /// Checksummed address of the contract owner.
    pub async fn get_owner(&self) -> WalletResult<String> {
        let owner = self
            .executor
            .read("get owner", ContractCall::Owner, |data| {
                IWallet::ownerCall::abi_decode_returns(data)
            })
            .await?;
        Ok(owner.to_checksum(None))
    }

    /// Hand contract ownership to `new_owner`.
    pub async fn transfer_ownership(&self, new_owner: Address) -> WalletResult<TxReceipt> {
        self.executor
            .execute(
                "transfer_ownership",
                ContractCall::TransferOwnership { new_owner },
            )
            .await
    }
}

/// Entry point of the `allowance` command.
pub async fn run_allowance<C: ContractClient + ?Sized>(
    client: &C,
    config: &RunnerConfig,
    reporter: &dyn Reporter,
    action: &str,
    target: &str,
    amount: i64,
) -> WalletResult<CommandOutput> {
    AllowanceRunner::new(client, config, reporter)
        .run(action, target, amount)
        .await
}

/// Entry point of the `owner` command.
pub async fn run_owner<C: ContractClient + ?Sized>(
    client: &C,
    config: &RunnerConfig,
    reporter: &dyn Reporter,
    action: &str,
    target: Option<&str>,
) -> WalletResult<CommandOutput> {
    OwnerRunner::new(client, config, reporter)
        .run(action, target)
        .await
}
