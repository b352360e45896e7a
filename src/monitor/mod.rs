// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Event Monitor
//!
//! Streams the wallet contract's events to the [`Reporter`] until shutdown.
//!
//! ## Strategy
//!
//! 1. **Bind**: the contract address is validated before anything is opened.
//! 2. **Subscribe**: one subscription per [`EventKind`]. If any of them fails
//!    the ones already opened are released and nothing is spawned.
//! 3. **Watch**: one task per subscription, all under a child of the caller's
//!    cancellation token. Logs that do not decode are skipped with a warning.
//! 4. **Fail fast**: the first watcher error cancels the others. Every watcher
//!    is joined before [`EventMonitor::start`] returns that error.

mod events;

pub use events::{AllowanceChanged, DomainEvent, MoneyReceived, MoneySent, OwnershipTransferred};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{bind_contract, ClientError, ContractClient, EventKind, Subscription};
use crate::error::{WalletError, WalletResult};
use crate::report::Reporter;

/// Subscribes to every wallet event and reports them as they arrive.
pub struct EventMonitor<C: ?Sized> {
    client: Arc<C>,
    contract_address: String,
    timeout: Duration,
    reporter: Arc<dyn Reporter>,
}

impl<C: ContractClient + ?Sized> EventMonitor<C> {
    /// `timeout` bounds the contract check and each subscribe request; the
    /// watchers themselves run until cancelled.
    pub fn new(
        client: Arc<C>,
        contract_address: impl Into<String>,
        timeout: Duration,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            contract_address: contract_address.into(),
            timeout,
            reporter,
        }
    }

    /// Run until `shutdown` is cancelled or a watcher fails.
    ///
    /// Returns `Ok(())` on cancellation, otherwise the first watcher error.
    pub async fn start(self, shutdown: CancellationToken) -> WalletResult<()> {
        let subscriptions = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Event monitor cancelled before watching");
                return Ok(());
            }
            opened = self.open_subscriptions() => opened?,
        };

        let token = shutdown.child_token();
        let mut watchers = JoinSet::new();
        let mut kinds = HashMap::new();
        for subscription in subscriptions {
            let kind = subscription.kind();
            let handle = watchers.spawn(watch(subscription, token.clone(), self.reporter.clone()));
            kinds.insert(handle.id(), kind);
        }

        let mut first_error = None;
        while let Some(joined) = watchers.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(join_error) => match kinds.get(&join_error.id()) {
                    Some(&kind) => Err(WalletError::Subscription {
                        kind,
                        source: ClientError::Subscription(format!("watcher task failed: {join_error}")),
                    }),
                    None => Err(WalletError::Watcher(join_error.to_string())),
                },
            };

            if let Err(e) = result {
                if first_error.is_none() {
                    tracing::error!(error = %e, "Watcher failed, stopping event monitor");
                    token.cancel();
                    first_error = Some(e);
                } else {
                    tracing::debug!(error = %e, "Additional watcher error after shutdown");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("Event monitor shut down");
                Ok(())
            }
        }
    }

    /// Bind the contract and open one subscription per event kind.
    ///
    /// Returning early drops (and releases) the subscriptions opened so far.
    async fn open_subscriptions(&self) -> WalletResult<Vec<Subscription>> {
        let binding = bind_contract(self.client.as_ref(), &self.contract_address, self.timeout).await?;

        let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());
        for kind in EventKind::ALL {
            let subscription =
                match tokio::time::timeout(self.timeout, self.client.subscribe(&binding, kind)).await
                {
                    Ok(Ok(subscription)) => subscription,
                    Ok(Err(source)) => return Err(WalletError::Subscription { kind, source }),
                    Err(_) => {
                        return Err(WalletError::Timeout {
                            operation: "subscribe to contract events",
                            after: self.timeout,
                        })
                    }
                };
            subscriptions.push(subscription);
        }

        tracing::info!(
            contract = %binding.address(),
            watchers = subscriptions.len(),
            "Event monitor starting"
        );

        Ok(subscriptions)
    }
}

/// Drain one subscription until cancellation, a feed error or a closed feed.
async fn watch(
    mut subscription: Subscription,
    shutdown: CancellationToken,
    reporter: Arc<dyn Reporter>,
) -> WalletResult<()> {
    let kind = subscription.kind();
    tracing::debug!(event = %kind, "Watcher listening");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                tracing::debug!(event = %kind, "Watcher cancelled");
                return Ok(());
            }

            Some(source) = subscription.errors.recv() => {
                return Err(WalletError::Subscription { kind, source });
            }

            log = subscription.events.recv() => {
                let Some(log) = log else {
                    return Err(WalletError::Subscription {
                        kind,
                        source: ClientError::Subscription("event feed closed".to_string()),
                    });
                };

                match events::DomainEvent::normalize(kind, &log, Utc::now()) {
                    Ok(event) => reporter.event(&event),
                    Err(e) => {
                        tracing::warn!(
                            event = %kind,
                            tx_hash = ?log.transaction_hash,
                            block_number = ?log.block_number,
                            error = %e,
                            "Skipping undecodable log"
                        );
                    }
                }
            }
        }
    }
}
