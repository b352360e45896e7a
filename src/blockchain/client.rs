// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM client for wallet contract interactions.
//!
//! [`ContractClient`] is the set of chain capabilities the transaction
//! pipeline and the event monitor rely on. [`EvmClient`] implements it on top
//! of an alloy provider; tests substitute their own implementation.

use std::time::Duration;

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::types::{BlockId, Filter, Log, TransactionRequest},
};
use async_trait::async_trait;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_util::sync::CancellationToken;

use super::contract::{event_signature, ContractCall};
use super::signing::SigningContext;
use super::types::*;

/// Delay between receipt lookups while waiting for a transaction to be mined.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Chain capabilities required by the wallet commands and the monitor.
///
/// Implementations never retry; callers decide what to do with failures.
#[async_trait]
pub trait ContractClient: Send + Sync {
    /// Next nonce for `account`, counting pending transactions.
    async fn pending_nonce(&self, account: Address) -> Result<u64, ClientError>;

    /// Chain identifier used for replay protection.
    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// Gas price suggested by the node, in wei.
    async fn suggest_gas_price(&self) -> Result<u128, ClientError>;

    /// Bytecode deployed at `address` (empty for externally owned accounts).
    async fn code_at(&self, address: Address) -> Result<Bytes, ClientError>;

    /// Execute a read-only call against the latest block.
    async fn call(&self, binding: &ContractBinding, call: &ContractCall)
        -> Result<Bytes, ClientError>;

    /// Sign and broadcast a state-changing call. Returns once the node accepted it.
    async fn submit(
        &self,
        signer: &SigningContext,
        binding: &ContractBinding,
        call: &ContractCall,
    ) -> Result<TxHash, ClientError>;

    /// Wait until the transaction is included in a block.
    async fn wait_mined(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError>;

    /// Open a log subscription for one event kind of the bound contract.
    async fn subscribe(
        &self,
        binding: &ContractBinding,
        kind: EventKind,
    ) -> Result<Subscription, ClientError>;

    /// Broadcast a contract creation transaction carrying `bytecode`.
    ///
    /// Returns the address the contract will live at and the transaction hash.
    async fn deploy(
        &self,
        signer: &SigningContext,
        bytecode: Bytes,
    ) -> Result<(Address, TxHash), ClientError>;
}

/// Alloy-backed [`ContractClient`].
pub struct EvmClient {
    endpoint: String,
    provider: DynProvider<Ethereum>,
    /// Whether the transport supports `eth_subscribe`
    pubsub: bool,
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("endpoint", &self.endpoint)
            .field("pubsub", &self.pubsub)
            .finish()
    }
}

impl EvmClient {
    /// Dial the endpoint. `ws://`/`wss://` endpoints get a pub-sub transport,
    /// `http://`/`https://` endpoints a request/response one.
    ///
    /// Fillers are disabled: nonce, chain id and gas are set explicitly from
    /// the [`SigningContext`].
    pub async fn connect(endpoint: &str) -> Result<Self, ClientError> {
        let url: url::Url = endpoint
            .parse()
            .map_err(|e: url::ParseError| ClientError::InvalidRpcUrl(e.to_string()))?;

        let (provider, pubsub) = match url.scheme() {
            "ws" | "wss" => {
                let provider = ProviderBuilder::new()
                    .disable_recommended_fillers()
                    .connect_ws(WsConnect::new(endpoint))
                    .await
                    .map_err(|e| ClientError::Rpc(format!("Failed to dial: {}", e)))?;
                (provider.erased(), true)
            }
            "http" | "https" => {
                let provider = ProviderBuilder::new()
                    .disable_recommended_fillers()
                    .connect_http(url.clone());
                (provider.erased(), false)
            }
            other => {
                return Err(ClientError::InvalidRpcUrl(format!(
                    "unsupported scheme `{other}`"
                )))
            }
        };

        tracing::debug!(endpoint, pubsub, "Connected to node");

        Ok(Self {
            endpoint: endpoint.to_string(),
            provider,
            pubsub,
        })
    }

    /// Fill gas, sign with the context's key and broadcast.
    async fn sign_and_send(
        &self,
        signer: &SigningContext,
        mut tx: TransactionRequest,
    ) -> Result<TxHash, ClientError> {
        tx = tx
            .with_from(signer.account())
            .with_nonce(signer.nonce())
            .with_chain_id(signer.chain_id())
            .with_gas_price(signer.gas_price());

        let gas_limit = if signer.gas_limit() == 0 {
            self.provider
                .estimate_gas(tx.clone())
                .await
                .map_err(|e| ClientError::Transaction(format!("Gas estimation failed: {}", e)))?
        } else {
            signer.gas_limit()
        };
        tx = tx.with_gas_limit(gas_limit);

        let wallet = EthereumWallet::from(signer.signer().clone());
        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| ClientError::Transaction(format!("Failed to sign: {}", e)))?;

        let pending = self
            .provider
            .send_tx_envelope(envelope)
            .await
            .map_err(|e| ClientError::Transaction(format!("Failed to send: {}", e)))?;

        Ok(*pending.tx_hash())
    }
}

#[async_trait]
impl ContractClient for EvmClient {
    async fn pending_nonce(&self, account: Address) -> Result<u64, ClientError> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn suggest_gas_price(&self) -> Result<u128, ClientError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ClientError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn call(
        &self,
        binding: &ContractBinding,
        call: &ContractCall,
    ) -> Result<Bytes, ClientError> {
        let tx = TransactionRequest::default()
            .with_to(binding.address())
            .with_input(call.calldata());

        self.provider
            .call(tx)
            .block(BlockId::latest())
            .await
            .map_err(|e| ClientError::Contract(format!("{}: {}", call.method(), e)))
    }

    async fn submit(
        &self,
        signer: &SigningContext,
        binding: &ContractBinding,
        call: &ContractCall,
    ) -> Result<TxHash, ClientError> {
        // Wallet methods are non-payable, so no value is attached here.
        let tx = TransactionRequest::default()
            .with_to(binding.address())
            .with_input(call.calldata());

        self.sign_and_send(signer, tx).await
    }

    async fn wait_mined(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ClientError::Rpc(format!("Failed to get receipt: {}", e)))?;

            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    tx_hash,
                    block_number: receipt.block_number.unwrap_or(0),
                    gas_used: receipt.gas_used as u64,
                    success: receipt.status(),
                    contract_address: receipt.contract_address,
                });
            }

            tracing::trace!(tx_hash = %tx_hash, "Transaction not yet mined");
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn subscribe(
        &self,
        binding: &ContractBinding,
        kind: EventKind,
    ) -> Result<Subscription, ClientError> {
        if !self.pubsub {
            return Err(ClientError::Unsupported(format!(
                "log subscriptions need a ws:// or wss:// endpoint, got {}",
                self.endpoint
            )));
        }

        let filter = Filter::new()
            .address(binding.address())
            .event_signature(event_signature(kind));

        let mut feed = self
            .provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| ClientError::Subscription(e.to_string()))?;

        let (event_tx, events) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (error_tx, errors) = mpsc::channel(1);
        let stop = CancellationToken::new();
        let stopped = stop.clone();
        let provider = self.provider.clone();

        tokio::spawn(async move {
            forward_logs(kind, &mut feed, event_tx, error_tx, stopped).await;
            if let Err(e) = provider.unsubscribe(*feed.local_id()).await {
                tracing::debug!(event = %kind, error = %e, "Unsubscribe failed");
            }
        });

        Ok(Subscription::new(kind, events, errors, move || stop.cancel()))
    }

    async fn deploy(
        &self,
        signer: &SigningContext,
        bytecode: Bytes,
    ) -> Result<(Address, TxHash), ClientError> {
        let address = signer.account().create(signer.nonce());
        let tx = TransactionRequest::default()
            .with_deploy_code(bytecode)
            .with_value(signer.value());

        let tx_hash = self.sign_and_send(signer, tx).await?;
        Ok((address, tx_hash))
    }
}

/// Source of logs for one subscription.
#[async_trait]
trait LogFeed: Send {
    async fn next_log(&mut self) -> Result<Log, RecvError>;
}

#[async_trait]
impl LogFeed for alloy::pubsub::Subscription<Log> {
    async fn next_log(&mut self) -> Result<Log, RecvError> {
        self.recv().await
    }
}

#[async_trait]
impl LogFeed for broadcast::Receiver<Log> {
    async fn next_log(&mut self) -> Result<Log, RecvError> {
        self.recv().await
    }
}

/// Relay logs from `feed` until `stop` fires, the receiving side goes away or
/// the feed closes. A closed feed is reported on `errors`; lagged logs are lost.
async fn forward_logs<F: LogFeed>(
    kind: EventKind,
    feed: &mut F,
    events: mpsc::Sender<RawLog>,
    errors: mpsc::Sender<ClientError>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            received = feed.next_log() => match received {
                Ok(log) => {
                    let raw = RawLog {
                        data: log.inner.data,
                        block_number: log.block_number,
                        transaction_hash: log.transaction_hash,
                    };
                    if events.send(raw).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(event = %kind, skipped, "Subscription lagged, logs dropped");
                }
                Err(RecvError::Closed) => {
                    let _ = errors
                        .send(ClientError::Subscription("connection closed".to_string()))
                        .await;
                    break;
                }
            }
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}
