// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet contract deployment.

use std::path::Path;

use alloy::primitives::{Address, Bytes, TxHash};

use crate::blockchain::{build_signer, with_deadline, ContractClient, RunnerConfig};
use crate::config::ConfigError;
use crate::error::{WalletError, WalletResult};
use crate::report::{display_wei, Reporter};

/// A confirmed contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Read compiled contract bytecode from a hex file (`0x` prefix optional).
pub fn read_bytecode(path: &Path) -> WalletResult<Bytes> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let hex = contents.trim();
    let bytecode = alloy::hex::decode(hex.trim_start_matches("0x")).map_err(|e| {
        ConfigError::InvalidValue {
            key: "bytecode",
            value: format!("{}: {}", path.display(), e),
        }
    })?;

    if bytecode.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "bytecode",
            value: format!("{} is empty", path.display()),
        }
        .into());
    }

    Ok(bytecode.into())
}

/// Deploy `bytecode` and wait until the creation transaction is mined.
///
/// The configured default value is sent along with the deployment.
pub async fn deploy_contract<C: ContractClient + ?Sized>(
    client: &C,
    config: &RunnerConfig,
    reporter: &dyn Reporter,
    bytecode: Bytes,
) -> WalletResult<Deployment> {
    let timeout = config.timeout;
    let signer = build_signer(client, &config.private_key, config.default_value, timeout).await?;

    let (expected, tx_hash) = match tokio::time::timeout(timeout, client.deploy(&signer, bytecode)).await {
        Ok(Ok(deployed)) => deployed,
        Ok(Err(e)) => return Err(WalletError::SubmissionFailed(e)),
        Err(_) => {
            return Err(WalletError::Timeout {
                operation: "deploy contract",
                after: timeout,
            })
        }
    };

    tracing::info!(
        address = %expected,
        tx_hash = %tx_hash,
        value = %display_wei(config.default_value),
        "Waiting for contract to be deployed"
    );

    let receipt = with_deadline("wait deployed", timeout, client.wait_mined(tx_hash)).await?;
    if !receipt.success {
        return Err(WalletError::ReceiptUnsuccessful {
            tx_hash: tx_hash.to_string(),
        });
    }

    reporter.transaction_processed("deploy", &receipt);

    Ok(Deployment {
        address: receipt.contract_address.unwrap_or(expected),
        tx_hash,
        block_number: receipt.block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testing::{StubClient, OWNER, TEST_KEY};
    use crate::report::testing::RecordingReporter;
    use alloy::primitives::U256;
    use std::io::Write;
    use std::time::Duration;

    fn config() -> RunnerConfig {
        RunnerConfig {
            private_key: TEST_KEY.to_string(),
            contract_address: String::new(),
            default_value: U256::from(1_000u64),
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn reads_hex_bytecode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0x6080604052").unwrap();
        let bytecode = read_bytecode(file.path()).unwrap();
        assert_eq!(bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn rejects_bad_bytecode_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not hex").unwrap();
        assert!(matches!(
            read_bytecode(file.path()),
            Err(WalletError::Config(ConfigError::InvalidValue { .. }))
        ));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(read_bytecode(empty.path()).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_bytecode(&dir.path().join("missing.hex")),
            Err(WalletError::Config(ConfigError::Read { .. }))
        ));
    }

    #[tokio::test]
    async fn deploys_at_the_nonce_derived_address() {
        let client = StubClient::default();
        client.set_nonce(3);
        let reporter = RecordingReporter::default();

        let deployment = deploy_contract(&client, &config(), &reporter, Bytes::from_static(&[0x60]))
            .await
            .unwrap();

        assert_eq!(deployment.address, OWNER.create(3));
        assert_eq!(deployment.tx_hash, StubClient::TX_HASH);
        assert_eq!(
            reporter.transactions(),
            vec![("deploy".to_string(), StubClient::TX_HASH)]
        );
    }

    #[tokio::test]
    async fn failed_deployment_receipt() {
        let client = StubClient::default();
        client.set_receipt_success(false);
        let reporter = RecordingReporter::default();

        let err = deploy_contract(&client, &config(), &reporter, Bytes::from_static(&[0x60]))
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::ReceiptUnsuccessful { .. }));
        assert!(reporter.transactions().is_empty());
    }

    #[tokio::test]
    async fn rejected_deployment_is_a_submission_failure() {
        let client = StubClient::default();
        client.fail_on("deploy");
        let reporter = RecordingReporter::default();

        let err = deploy_contract(&client, &config(), &reporter, Bytes::from_static(&[0x60]))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::SubmissionFailed(_)));
    }
}
