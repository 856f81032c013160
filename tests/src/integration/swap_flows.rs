//! # Swap Flow Tests
//!
//! ```text
//! initiate ──→ EVM_ORDER_CREATED / NON_EVM_ESCROW_LOCKED (either order)
//!    │
//!    ├── claim (taker, secret, after public withdrawal) ──→ *_CLAIMED ──→ COMPLETED
//!    │
//!    └── refund (maker, after cancellation) ──→ *_REFUNDED
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: both legs claimed, status derived from monitors
//! 2. **Refund**: cancellation window, maker-only refunds
//! 3. **Window Drift**: EVM windows follow the on-chain `deployedAt`
//! 4. **Secret Reveal**: only after a claim, verified, idempotent, enables
//!    secretless claims

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use htlc_core::algorithms::commitment::encode_fulfillment;
    use htlc_core::domain::{ChainCall, EscrowMonitor, EscrowRef, SwapAction, TimelockStage};
    use htlc_core::{
        ChainType, ErrorKind, MonitorStatus, PreconditionFailure, Preimage, RecordStore, SwapApi,
        SwapError, SwapStatus, Timelocks,
    };

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_happy_path_completes_both_legs() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;

        // Initiation: one INITIATED entry and one lock entry per leg.
        let record = h.coordinator.get_swap(id).await.unwrap();
        assert_eq!(record.history.len(), 3);
        assert_eq!(record.history[0].status, SwapStatus::Initiated);
        assert!(record.secret.is_none());
        assert!(matches!(record.evm.escrow, Some(EscrowRef::Evm { .. })));
        assert!(matches!(record.xrpl.escrow, Some(EscrowRef::Ledger { .. })));

        let monitors = h.coordinator.monitors_for(id).await.unwrap();
        assert_eq!(monitors.len(), 2);
        assert!(monitors.iter().all(|m| m.status == MonitorStatus::Pending));

        h.clock.advance(30);

        // Ledger leg first, with the secret.
        let ledger = h
            .coordinator
            .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap();
        assert_eq!(ledger.action, SwapAction::Claim);
        assert_eq!(ledger.status, SwapStatus::NonEvmClaimed);

        let finish = h.xrpl.submitted().last().cloned().unwrap();
        match finish.call {
            ChainCall::LedgerEscrowFinish {
                fulfillment,
                condition,
                owner,
                ..
            } => {
                assert_eq!(fulfillment, encode_fulfillment(&initiated.secret));
                assert_eq!(condition, record.condition);
                assert_eq!(owner, XRPL_MAKER);
            }
            other => panic!("unexpected ledger call {other:?}"),
        }
        assert_eq!(finish.from, XRPL_TAKER);

        // EVM leg uses the secret now on record.
        let evm = h
            .coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, None)
            .await
            .unwrap();
        assert_eq!(evm.status, SwapStatus::Completed);

        let record = h.coordinator.get_swap(id).await.unwrap();
        assert_eq!(record.status, SwapStatus::Completed);
        assert_eq!(record.last_event().unwrap().status, SwapStatus::Completed);
        assert_eq!(record.evm.claim_tx.as_deref(), Some(evm.tx_hash.as_str()));
        assert_eq!(record.xrpl.claim_tx.as_deref(), Some(ledger.tx_hash.as_str()));
        assert_eq!(h.evm.settled_escrows() + h.xrpl.settled_escrows(), 2);

        let monitors = h.coordinator.monitors_for(id).await.unwrap();
        assert!(monitors.iter().all(|m| m.status == MonitorStatus::Resolved));
    }

    #[tokio::test]
    async fn test_claim_by_non_taker_is_rejected_and_recorded() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;
        h.clock.advance(30);

        let err = h
            .coordinator
            .claim(id, ChainType::Evm, EVM_MAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Precondition(PreconditionFailure::WrongCaller { .. })
        ));

        let record = h.coordinator.get_swap(id).await.unwrap();
        let last = record.last_event().unwrap();
        assert_eq!(last.status, SwapStatus::Failed);
        assert_eq!(last.chain_type, Some(ChainType::Evm));
        assert_ne!(record.status, SwapStatus::Failed);
        // Nothing reached the chain beyond the two locks.
        assert_eq!(h.evm.submitted().len(), 1);
    }

    // =========================================================================
    // REFUND
    // =========================================================================

    #[tokio::test]
    async fn test_refund_after_cancellation() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;

        h.clock.advance(599);
        let early = h
            .coordinator
            .refund(id, ChainType::Evm, EVM_MAKER)
            .await
            .unwrap_err();
        assert!(matches!(
            early,
            SwapError::Precondition(PreconditionFailure::TooEarly { .. })
        ));

        h.clock.advance(1);
        for chain in ChainType::ALL {
            let wrong = h.coordinator.refund(id, chain, taker(chain)).await.unwrap_err();
            assert_eq!(wrong.kind(), ErrorKind::Precondition);

            let outcome = h.coordinator.refund(id, chain, maker(chain)).await.unwrap();
            assert_eq!(outcome.status, chain.refunded_status());
        }

        let record = h.coordinator.get_swap(id).await.unwrap();
        assert_ne!(record.status, SwapStatus::Completed);
        assert!(record.evm.refund_tx.is_some());
        assert!(record.xrpl.refund_tx.is_some());
        assert!(record.secret.is_none());

        let monitors = h.coordinator.monitors_for(id).await.unwrap();
        assert!(monitors.iter().all(|m| m.status == MonitorStatus::Canceled));

        // A refunded leg cannot be claimed afterwards.
        let err = h
            .coordinator
            .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Precondition(PreconditionFailure::LegSettled {
                status: MonitorStatus::Canceled,
                ..
            })
        ));
    }

    // =========================================================================
    // WINDOW DRIFT
    // =========================================================================

    #[tokio::test]
    async fn test_evm_windows_follow_onchain_deployment_time() {
        let h = Harness::new();
        h.evm.set_inclusion_lag(12);
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;

        // Recorded windows are the requested ones; the monitor tracks the
        // cancellation the escrow enforces.
        let record = h.coordinator.get_swap(id).await.unwrap();
        assert_eq!(record.evm.timelocks.public_withdrawal, T0 + 30);
        let monitors = h.coordinator.monitors_for(id).await.unwrap();
        let evm_monitor = monitors.iter().find(|m| m.chain_type == ChainType::Evm).unwrap();
        assert_eq!(evm_monitor.timelock, T0 + 612);

        h.clock.advance(35);
        let err = h
            .coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        match err {
            SwapError::Precondition(PreconditionFailure::TooEarly { opens_at, .. }) => {
                assert_eq!(opens_at, T0 + 42)
            }
            other => panic!("expected TooEarly, got {other:?}"),
        }

        // The ledger leg has no drift.
        h.coordinator
            .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap();

        h.clock.set(T0 + 42);
        h.coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, None)
            .await
            .unwrap();

        let withdraw = h.evm.submitted().last().cloned().unwrap();
        match withdraw.call {
            ChainCall::EvmWithdraw { immutables, .. } => {
                let onchain = Timelocks::unpack(immutables.timelocks);
                assert_eq!(onchain.deployed_at(), T0 + 12);
                assert_eq!(onchain.timestamp(TimelockStage::DstWithdrawal), Some(T0 + 42));
            }
            other => panic!("unexpected EVM call {other:?}"),
        }
        assert_eq!(
            h.coordinator.get_swap(id).await.unwrap().status,
            SwapStatus::Completed
        );
    }

    // =========================================================================
    // SECRET REVEAL
    // =========================================================================

    #[tokio::test]
    async fn test_reveal_secret_enables_claims_without_secret() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;

        // Nothing claimed yet: the secret stays out of the store.
        let early = h
            .coordinator
            .reveal_secret(id, initiated.secret.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            early,
            SwapError::Precondition(PreconditionFailure::NoClaimObserved)
        ));
        assert!(h.coordinator.get_swap(id).await.unwrap().secret.is_none());

        // Ledger claim confirms, but the swap write carrying the secret is lost.
        h.clock.advance(30);
        h.swaps.fail_next_writes(3);
        h.coordinator
            .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        assert_eq!(
            h.monitors
                .get(&EscrowMonitor::key_for(id, ChainType::Xrpl))
                .await
                .unwrap()
                .status,
            MonitorStatus::Resolved
        );

        let wrong = h
            .coordinator
            .reveal_secret(id, Preimage::new([0x5a; 32]))
            .await
            .unwrap_err();
        assert_eq!(wrong.kind(), ErrorKind::Validation);
        assert!(h.coordinator.get_swap(id).await.unwrap().secret.is_none());

        let revealed = h
            .coordinator
            .reveal_secret(id, initiated.secret.clone())
            .await
            .unwrap();
        assert_eq!(revealed.status, SwapStatus::SecretRevealed);
        let again = h
            .coordinator
            .reveal_secret(id, initiated.secret.clone())
            .await
            .unwrap();
        assert_eq!(again.history.len(), revealed.history.len());

        h.coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, None)
            .await
            .unwrap();
        assert_eq!(
            h.coordinator.get_swap(id).await.unwrap().status,
            SwapStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_claim_without_any_secret_fails() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        h.clock.advance(30);
        let err = h
            .coordinator
            .claim(initiated.record.id, ChainType::Evm, EVM_TAKER, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Precondition(PreconditionFailure::MissingSecret)
        ));
    }
}
