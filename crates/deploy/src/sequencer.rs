//! Deployment sequencer.
//!
//! Contracts are deployed one at a time in input order. A contract is only
//! broadcast once the previous one reached a terminal state, so later
//! constructor arguments may safely refer to earlier addresses.
//!
//! The first failed deployment stops the sequence: the returned results end
//! with that failure and the remaining specs are never broadcast.

use alloy_core::primitives::{Address, TxHash};

use crate::{
    errors::{ConfirmationError, DeployError},
    traits::{Broadcaster, ProgressEvent, Reporter},
    types::{ContractSpec, DeploymentResult},
};

struct FinalizedDeployment {
    transaction_hash: TxHash,
    address: Address,
}

struct DeploymentFailure {
    transaction_hash: Option<TxHash>,
    error: DeployError,
}

impl DeploymentFailure {
    fn confirmation(transaction_hash: TxHash, error: ConfirmationError) -> Self {
        Self {
            transaction_hash: Some(transaction_hash),
            error: error.into(),
        }
    }
}

/// Deploy `specs` in order, stopping after the first failure.
///
/// The returned results are in deployment order; when shorter than `specs`,
/// the last entry is the failure that stopped the sequence.
pub async fn deploy<B, R>(
    specs: &[ContractSpec],
    broadcaster: &B,
    reporter: &R,
) -> Vec<DeploymentResult>
where
    B: Broadcaster,
    R: Reporter,
{
    let mut results = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        reporter.report(&ProgressEvent::DeploymentStarted {
            index,
            total: specs.len(),
            contract: spec.name.clone(),
        });

        match deploy_one(spec, broadcaster).await {
            Ok(FinalizedDeployment {
                transaction_hash,
                address,
            }) => {
                reporter.report(&ProgressEvent::DeploymentFinalized {
                    contract: spec.name.clone(),
                    address,
                    transaction_hash,
                });
                results.push(DeploymentResult::finalized(
                    spec.clone(),
                    transaction_hash,
                    address,
                ));
            }
            Err(DeploymentFailure {
                transaction_hash,
                error,
            }) => {
                reporter.report(&ProgressEvent::DeploymentFailed {
                    contract: spec.name.clone(),
                    cause: error.to_string(),
                });
                results.push(DeploymentResult::failed(
                    spec.clone(),
                    transaction_hash,
                    error,
                ));

                let remaining: Vec<String> =
                    specs[index + 1..].iter().map(|s| s.name.clone()).collect();
                if !remaining.is_empty() {
                    reporter.report(&ProgressEvent::DeploymentsAborted { remaining });
                }
                break;
            }
        }
    }

    results
}

/// Broadcast one contract and wait for it to reach a terminal state.
async fn deploy_one<B: Broadcaster>(
    spec: &ContractSpec,
    broadcaster: &B,
) -> Result<FinalizedDeployment, DeploymentFailure> {
    let pending = broadcaster
        .broadcast(&spec.name, &spec.constructor_arguments)
        .await
        .map_err(|err| DeploymentFailure {
            transaction_hash: None,
            error: err.into(),
        })?
        .ok_or(DeploymentFailure {
            transaction_hash: None,
            error: ConfirmationError::MissingHandle.into(),
        })?;

    let tx = pending.hash;
    tracing::debug!(contract = %spec.name, tx_hash = %tx, "Waiting for deployment transaction");

    let confirmation = broadcaster
        .wait(&pending)
        .await
        .map_err(|err| DeploymentFailure::confirmation(tx, err))?;

    if !confirmation.finalized {
        return Err(DeploymentFailure::confirmation(
            tx,
            ConfirmationError::NotFinalized(tx),
        ));
    }

    let address = confirmation
        .contract_address
        .filter(|address| !address.is_zero())
        .ok_or_else(|| {
            DeploymentFailure::confirmation(tx, ConfirmationError::MissingContractAddress(tx))
        })?;

    Ok(FinalizedDeployment {
        transaction_hash: tx,
        address,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;
    use crate::{
        errors::{BroadcastError, ConfigurationError},
        traits::{Confirmation, PendingTransaction},
        types::DeploymentStatus,
    };

    /// Broadcaster replaying a scripted answer per contract name.
    #[derive(Default)]
    struct ScriptedBroadcaster {
        handles: Vec<(&'static str, Result<Option<PendingTransaction>, BroadcastError>)>,
        confirmations: Vec<(TxHash, Result<Confirmation, ConfirmationError>)>,
        calls: Mutex<Vec<String>>,
    }

    impl Broadcaster for ScriptedBroadcaster {
        async fn deployer(&self) -> Result<Address, ConfigurationError> {
            Ok(Address::repeat_byte(0xde))
        }

        async fn broadcast(
            &self,
            contract: &str,
            _constructor_arguments: &[Value],
        ) -> Result<Option<PendingTransaction>, BroadcastError> {
            self.calls.lock().unwrap().push(format!("broadcast:{contract}"));
            self.handles
                .iter()
                .find(|(name, _)| *name == contract)
                .map(|(_, answer)| answer.clone())
                .expect("unscripted contract")
        }

        async fn wait(
            &self,
            pending: &PendingTransaction,
        ) -> Result<Confirmation, ConfirmationError> {
            self.calls.lock().unwrap().push(format!("wait:{}", pending.hash));
            self.confirmations
                .iter()
                .find(|(hash, _)| *hash == pending.hash)
                .map(|(_, answer)| answer.clone())
                .expect("unscripted transaction")
        }
    }

    struct Silent;

    impl Reporter for Silent {
        fn report(&self, _event: &ProgressEvent) {}
    }

    fn pending(byte: u8) -> Option<PendingTransaction> {
        Some(PendingTransaction {
            hash: TxHash::repeat_byte(byte),
        })
    }

    fn mined(address: Option<Address>) -> Confirmation {
        Confirmation {
            finalized: true,
            contract_address: address,
            block_number: Some(1),
        }
    }

    #[tokio::test]
    async fn test_each_wait_precedes_next_broadcast() {
        let broadcaster = ScriptedBroadcaster {
            handles: vec![("A", Ok(pending(1))), ("B", Ok(pending(2)))],
            confirmations: vec![
                (TxHash::repeat_byte(1), Ok(mined(Some(Address::repeat_byte(0xa))))),
                (TxHash::repeat_byte(2), Ok(mined(Some(Address::repeat_byte(0xb))))),
            ],
            ..Default::default()
        };
        let specs = [ContractSpec::new("A"), ContractSpec::new("B")];

        let results = deploy(&specs, &broadcaster, &Silent).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].address(), Some(Address::repeat_byte(0xa)));
        assert_eq!(results[1].address(), Some(Address::repeat_byte(0xb)));
        assert_eq!(
            *broadcaster.calls.lock().unwrap(),
            vec![
                "broadcast:A".to_string(),
                format!("wait:{}", TxHash::repeat_byte(1)),
                "broadcast:B".to_string(),
                format!("wait:{}", TxHash::repeat_byte(2)),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_handle_fails_without_wait() {
        let broadcaster = ScriptedBroadcaster {
            handles: vec![("A", Ok(None))],
            ..Default::default()
        };

        let results = deploy(&[ContractSpec::new("A")], &broadcaster, &Silent).await;

        assert_eq!(results[0].status(), DeploymentStatus::Failed);
        assert_eq!(
            results[0].error(),
            Some(&DeployError::Confirmation(ConfirmationError::MissingHandle))
        );
        assert_eq!(*broadcaster.calls.lock().unwrap(), vec!["broadcast:A"]);
    }

    #[tokio::test]
    async fn test_unfinalized_and_zero_address_receipts_fail() {
        let tx = TxHash::repeat_byte(1);
        for confirmation in [
            Confirmation {
                finalized: false,
                ..mined(Some(Address::repeat_byte(0xa)))
            },
            mined(Some(Address::ZERO)),
        ] {
            let broadcaster = ScriptedBroadcaster {
                handles: vec![("A", Ok(pending(1)))],
                confirmations: vec![(tx, Ok(confirmation))],
                ..Default::default()
            };

            let results = deploy(&[ContractSpec::new("A")], &broadcaster, &Silent).await;

            assert_eq!(results[0].status(), DeploymentStatus::Failed);
            assert!(results[0].address().is_none());
            assert_eq!(results[0].transaction_hash(), Some(tx));
        }
    }

    #[tokio::test]
    async fn test_stops_after_first_failure() {
        let broadcaster = ScriptedBroadcaster {
            handles: vec![
                ("A", Ok(pending(1))),
                ("B", Err(BroadcastError::Rejected("nonce too low".to_string()))),
                ("C", Ok(pending(3))),
            ],
            confirmations: vec![(
                TxHash::repeat_byte(1),
                Ok(mined(Some(Address::repeat_byte(0xa)))),
            )],
            ..Default::default()
        };
        let specs = [
            ContractSpec::new("A"),
            ContractSpec::new("B"),
            ContractSpec::new("C"),
        ];

        let results = deploy(&specs, &broadcaster, &Silent).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_finalized());
        assert_eq!(results[1].status(), DeploymentStatus::Failed);
        assert!(results[1].transaction_hash().is_none());
        assert!(
            !broadcaster
                .calls
                .lock()
                .unwrap()
                .contains(&"broadcast:C".to_string())
        );
    }

    #[tokio::test]
    async fn test_confirmation_error_keeps_hash_and_stops() {
        let tx = TxHash::repeat_byte(1);
        for err in [
            ConfirmationError::Timeout {
                tx,
                after: std::time::Duration::from_secs(300),
            },
            ConfirmationError::Receipt {
                tx,
                reason: "connection reset".to_string(),
            },
        ] {
            let broadcaster = ScriptedBroadcaster {
                handles: vec![("A", Ok(pending(1))), ("B", Ok(pending(2)))],
                confirmations: vec![(tx, Err(err.clone()))],
                ..Default::default()
            };
            let specs = [ContractSpec::new("A"), ContractSpec::new("B")];

            let results = deploy(&specs, &broadcaster, &Silent).await;

            assert_eq!(results.len(), 1);
            assert_eq!(results[0].status(), DeploymentStatus::Failed);
            assert!(results[0].address().is_none());
            assert_eq!(results[0].transaction_hash(), Some(tx));
            assert_eq!(results[0].error(), Some(&DeployError::Confirmation(err)));
            assert_eq!(
                *broadcaster.calls.lock().unwrap(),
                vec!["broadcast:A".to_string(), format!("wait:{tx}")]
            );
        }
    }
}
