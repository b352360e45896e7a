// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory [`ContractClient`] used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::{
    primitives::{address, Address, Bytes, TxHash, U256},
    sol_types::SolValue,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::client::{ClientError, ContractClient};
use super::contract::ContractCall;
use super::signing::SigningContext;
use super::types::*;

// Anvil's first default account
pub const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const BENEFICIARY: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const OWNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

type Feeds = HashMap<EventKind, (mpsc::Sender<RawLog>, mpsc::Sender<ClientError>)>;

/// Call-counting stub with scripted responses.
pub struct StubClient {
    calls: AtomicUsize,
    nonce: AtomicU64,
    code: Mutex<Bytes>,
    allowance_wei: Mutex<U256>,
    failing: Mutex<HashSet<&'static str>>,
    failing_kinds: Mutex<HashSet<EventKind>>,
    hanging_kinds: Mutex<HashSet<EventKind>>,
    receipt_success: AtomicBool,
    hang_wait_mined: AtomicBool,
    submitted: Mutex<Vec<ContractCall>>,
    feeds: Mutex<Feeds>,
    unsubscribed: Arc<AtomicUsize>,
}

impl Default for StubClient {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            nonce: AtomicU64::new(0),
            code: Mutex::new(Bytes::from_static(&[0x60, 0x80, 0x60, 0x40])),
            allowance_wei: Mutex::new(U256::from(2u64) * WEI_PER_ETHER),
            failing: Mutex::new(HashSet::new()),
            failing_kinds: Mutex::new(HashSet::new()),
            hanging_kinds: Mutex::new(HashSet::new()),
            receipt_success: AtomicBool::new(true),
            hang_wait_mined: AtomicBool::new(false),
            submitted: Mutex::new(Vec::new()),
            feeds: Mutex::new(HashMap::new()),
            unsubscribed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl StubClient {
    pub const CHAIN_ID: u64 = 31337;
    pub const GAS_PRICE: u128 = 1_000_000_000;
    pub const TX_HASH: TxHash = TxHash::repeat_byte(0xab);

    /// Total number of client calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }

    pub fn set_code(&self, code: Bytes) {
        *self.code.lock().unwrap() = code;
    }

    pub fn set_allowance_wei(&self, amount: U256) {
        *self.allowance_wei.lock().unwrap() = amount;
    }

    /// Make the named method return an error.
    pub fn fail_on(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    /// Make subscribing to `kind` fail.
    pub fn fail_subscription(&self, kind: EventKind) {
        self.failing_kinds.lock().unwrap().insert(kind);
    }

    /// Make subscribing to `kind` never return.
    pub fn hang_subscription(&self, kind: EventKind) {
        self.hanging_kinds.lock().unwrap().insert(kind);
    }

    pub fn set_receipt_success(&self, success: bool) {
        self.receipt_success.store(success, Ordering::SeqCst);
    }

    /// Make `wait_mined` never return.
    pub fn hang_wait_mined(&self) {
        self.hang_wait_mined.store(true, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<ContractCall> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn unsubscribed(&self) -> usize {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> usize {
        self.feeds.lock().unwrap().len()
    }

    /// Wait until `count` subscriptions are open.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.subscriptions() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriptions were not opened in time");
    }

    /// Deliver a log to the subscription of `kind`.
    pub async fn emit(&self, kind: EventKind, log: RawLog) {
        let sender = self.feeds.lock().unwrap()[&kind].0.clone();
        sender.send(log).await.expect("watcher dropped its feed");
    }

    /// Fire the error channel of the subscription of `kind`.
    pub async fn break_feed(&self, kind: EventKind, error: ClientError) {
        let sender = self.feeds.lock().unwrap()[&kind].1.clone();
        sender.send(error).await.expect("watcher dropped its feed");
    }

    /// Close the delivery channel of the subscription of `kind`.
    pub fn close_feed(&self, kind: EventKind) {
        if let Some((events, _errors)) = self.feeds.lock().unwrap().get_mut(&kind) {
            let (closed, _) = mpsc::channel(1);
            *events = closed;
        }
    }

    fn record(&self, method: &'static str) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(method) {
            return Err(ClientError::Rpc(format!("{method} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl ContractClient for StubClient {
    async fn pending_nonce(&self, _account: Address) -> Result<u64, ClientError> {
        self.record("pending_nonce")?;
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.record("chain_id")?;
        Ok(Self::CHAIN_ID)
    }

    async fn suggest_gas_price(&self) -> Result<u128, ClientError> {
        self.record("suggest_gas_price")?;
        Ok(Self::GAS_PRICE)
    }

    async fn code_at(&self, _address: Address) -> Result<Bytes, ClientError> {
        self.record("code_at")?;
        Ok(self.code.lock().unwrap().clone())
    }

    async fn call(
        &self,
        _binding: &ContractBinding,
        call: &ContractCall,
    ) -> Result<Bytes, ClientError> {
        self.record("call")?;
        let encoded = match call {
            ContractCall::Owner => OWNER.abi_encode(),
            ContractCall::Allowance { .. } => self.allowance_wei.lock().unwrap().abi_encode(),
            other => {
                return Err(ClientError::Contract(format!(
                    "{} is not a view method",
                    other.method()
                )))
            }
        };
        Ok(encoded.into())
    }

    async fn submit(
        &self,
        _signer: &SigningContext,
        _binding: &ContractBinding,
        call: &ContractCall,
    ) -> Result<TxHash, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains("submit") {
            return Err(ClientError::Transaction(
                "execution reverted: caller is not the owner".to_string(),
            ));
        }
        self.submitted.lock().unwrap().push(call.clone());
        Ok(Self::TX_HASH)
    }

    async fn wait_mined(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError> {
        self.record("wait_mined")?;
        if self.hang_wait_mined.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: 42,
            gas_used: 21_000,
            success: self.receipt_success.load(Ordering::SeqCst),
            contract_address: None,
        })
    }

    async fn subscribe(
        &self,
        _binding: &ContractBinding,
        kind: EventKind,
    ) -> Result<Subscription, ClientError> {
        self.record("subscribe")?;
        if self.failing_kinds.lock().unwrap().contains(&kind) {
            return Err(ClientError::Subscription(format!("{kind} filter rejected")));
        }
        if self.hanging_kinds.lock().unwrap().contains(&kind) {
            std::future::pending::<()>().await;
        }
        let (event_tx, events) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (error_tx, errors) = mpsc::channel(1);
        self.feeds.lock().unwrap().insert(kind, (event_tx, error_tx));

        let unsubscribed = self.unsubscribed.clone();
        Ok(Subscription::new(kind, events, errors, move || {
            unsubscribed.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn deploy(
        &self,
        signer: &SigningContext,
        _bytecode: Bytes,
    ) -> Result<(Address, TxHash), ClientError> {
        self.record("deploy")?;
        Ok((signer.account().create(signer.nonce()), Self::TX_HASH))
    }
}
