//! # Failure Recovery Tests
//!
//! Every failed attempt leaves a FAILED history entry without moving the
//! swap status. Chain failures also mark the leg monitor FAILED; the leg
//! may be retried until the retry budget runs out.
//!
//! ## Test Categories
//!
//! 1. **Submission Outage**: transport errors, retry, retry budget
//! 2. **Confirmation Timeout**: deadline on `await_confirmation`
//! 3. **Store Outage**: settlement replayed from the monitor
//! 4. **Partial Lock**: one leg locked, the other failed

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use htlc_core::algorithms::{failed_attempts, leg_status_from_history, LegState};
    use htlc_core::{
        ChainType, CoordinatorConfig, ErrorKind, MonitorStatus, PreconditionFailure,
        RecordStore, SwapApi, SwapError, SwapStatus,
    };
    use htlc_core::domain::EscrowMonitor;
    use std::time::Duration;

    async fn monitor(h: &Harness, id: uuid::Uuid, chain: ChainType) -> EscrowMonitor {
        h.monitors
            .get(&EscrowMonitor::key_for(id, chain))
            .await
            .unwrap()
    }

    // =========================================================================
    // SUBMISSION OUTAGE
    // =========================================================================

    #[tokio::test]
    async fn test_submission_outage_marks_leg_failed_then_retry_succeeds() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;
        h.clock.advance(30);

        h.evm.fail_next_submissions(3);
        let err = h
            .coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChainSubmission);

        let failed = monitor(&h, id, ChainType::Evm).await;
        assert_eq!(failed.status, MonitorStatus::Failed);
        assert!(failed.retryable);
        assert_eq!(failed.retry_count, 0);

        let record = h.coordinator.get_swap(id).await.unwrap();
        let last = record.last_event().unwrap();
        assert_eq!(last.status, SwapStatus::Failed);
        assert_eq!(last.details["retryable"], true);
        assert_eq!(failed_attempts(&record.history, ChainType::Evm), 1);
        assert_ne!(record.status, SwapStatus::Failed);

        h.coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap();
        let resolved = monitor(&h, id, ChainType::Evm).await;
        assert_eq!(resolved.status, MonitorStatus::Resolved);
        assert_eq!(resolved.retry_count, 1);
        assert_eq!(
            h.coordinator.get_swap(id).await.unwrap().status,
            SwapStatus::EvmClaimed
        );
    }

    #[tokio::test]
    async fn test_leg_is_not_retried_past_budget() {
        let h = Harness::with_config(CoordinatorConfig {
            max_leg_retries: 1,
            ..CoordinatorConfig::for_testing()
        });
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;
        h.clock.advance(600);

        for _ in 0..2 {
            h.xrpl.fail_next_submissions(3);
            let err = h
                .coordinator
                .refund(id, ChainType::Xrpl, XRPL_MAKER)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ChainSubmission);
        }
        assert_eq!(monitor(&h, id, ChainType::Xrpl).await.retry_count, 1);

        let submitted = h.xrpl.submitted().len();
        let err = h
            .coordinator
            .refund(id, ChainType::Xrpl, XRPL_MAKER)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Precondition(PreconditionFailure::RetriesExhausted { retries: 1, max: 1, .. })
        ));
        assert_eq!(h.xrpl.submitted().len(), submitted);

        let record = h.coordinator.get_swap(id).await.unwrap();
        assert_eq!(failed_attempts(&record.history, ChainType::Xrpl), 3);
        assert_eq!(leg_status_from_history(&record.history, ChainType::Xrpl), LegState::Failed);
    }

    // =========================================================================
    // CONFIRMATION TIMEOUT
    // =========================================================================

    #[tokio::test]
    async fn test_confirmation_timeout_is_recorded_as_retryable() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;
        h.clock.advance(30);

        h.xrpl.set_confirmation_delay(Some(Duration::from_secs(5)));
        let err = h
            .coordinator
            .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Timeout { .. }));
        assert!(err.is_retryable());

        let leg = monitor(&h, id, ChainType::Xrpl).await;
        assert_eq!(leg.status, MonitorStatus::Failed);
        assert!(leg.retryable);
        assert!(leg.error_message.is_some());

        let record = h.coordinator.get_swap(id).await.unwrap();
        assert!(record.xrpl.claim_tx.is_none());
        assert_eq!(record.last_event().unwrap().status, SwapStatus::Failed);
    }

    // =========================================================================
    // STORE OUTAGE
    // =========================================================================

    #[tokio::test]
    async fn test_lost_swap_write_is_replayed_by_reconcile() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;
        h.clock.advance(30);

        // Settlement lands on chain and in the monitor, the swap write is lost.
        h.swaps.fail_next_writes(3);
        let err = h
            .coordinator
            .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(monitor(&h, id, ChainType::Xrpl).await.status, MonitorStatus::Resolved);
        assert!(h.coordinator.get_swap(id).await.unwrap().xrpl.claim_tx.is_none());

        let repaired = h.coordinator.reconcile(id).await.unwrap();
        assert_eq!(repaired.status, SwapStatus::NonEvmClaimed);
        let settled_tx = monitor(&h, id, ChainType::Xrpl).await.latest_tx().map(str::to_string);
        assert_eq!(repaired.xrpl.claim_tx, settled_tx);
        assert_eq!(repaired.last_event().unwrap().details["source"], "monitor");

        // Reconcile is idempotent.
        let again = h.coordinator.reconcile(id).await.unwrap();
        assert_eq!(again.history.len(), repaired.history.len());

        h.coordinator
            .claim(id, ChainType::Evm, EVM_TAKER, Some(initiated.secret.clone()))
            .await
            .unwrap();
        assert_eq!(
            h.coordinator.get_swap(id).await.unwrap().status,
            SwapStatus::Completed
        );
    }

    // =========================================================================
    // PARTIAL LOCK
    // =========================================================================

    #[tokio::test]
    async fn test_partial_lock_leaves_refundable_leg() {
        let h = Harness::new();
        h.xrpl.fail_next_submissions(3);
        let err = h.coordinator.initiate(swap_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChainSubmission);

        let swaps = h.coordinator.list_swaps().await.unwrap();
        assert_eq!(swaps.len(), 1);
        let record = &swaps[0];
        assert_eq!(record.status, SwapStatus::EvmOrderCreated);
        assert!(record.xrpl.escrow.is_none());
        assert_eq!(failed_attempts(&record.history, ChainType::Xrpl), 1);

        let monitors = h.coordinator.monitors_for(record.id).await.unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].chain_type, ChainType::Evm);

        let err = h
            .coordinator
            .refund(record.id, ChainType::Xrpl, XRPL_MAKER)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Precondition(PreconditionFailure::LegNotLocked { chain: ChainType::Xrpl })
        ));

        h.clock.advance(600);
        let outcome = h
            .coordinator
            .refund(record.id, ChainType::Evm, EVM_MAKER)
            .await
            .unwrap();
        assert_eq!(outcome.status, SwapStatus::EvmRefunded);
    }
}
