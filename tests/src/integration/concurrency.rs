//! # Concurrency Tests
//!
//! History is append-only under concurrent writers, both legs may settle
//! at the same time, and many swaps can be driven in parallel.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use futures::future::join_all;
    use htlc_core::{
        reconcile_all, ChainType, RecordStore, SwapApi, SwapError, SwapEvent, SwapStatus,
    };
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_history_appends_are_all_kept() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let key = initiated.record.id.to_string();
        let before = initiated.record.history.len();

        const N: usize = 32;
        let handles: Vec<_> = (0..N)
            .map(|i| {
                let swaps = Arc::clone(&h.swaps);
                let key = key.clone();
                tokio::spawn(async move {
                    let error = SwapError::Validation(format!("probe {i}"));
                    swaps
                        .append_history(&key, SwapEvent::failure(T0 + i as u64, &error))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = h.coordinator.get_swap(initiated.record.id).await.unwrap();
        assert_eq!(record.history.len(), before + N);
        // Appends never rewind time.
        assert!(record
            .history
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_both_legs_claimed_concurrently_complete_once() {
        let h = Harness::new();
        let initiated = h.coordinator.initiate(swap_request()).await.unwrap();
        let id = initiated.record.id;
        h.clock.advance(30);

        let (evm, xrpl) = tokio::join!(
            h.coordinator
                .claim(id, ChainType::Evm, EVM_TAKER, Some(initiated.secret.clone())),
            h.coordinator
                .claim(id, ChainType::Xrpl, XRPL_TAKER, Some(initiated.secret.clone()))
        );
        evm.unwrap();
        xrpl.unwrap();

        let record = h.coordinator.reconcile(id).await.unwrap();
        assert_eq!(record.status, SwapStatus::Completed);
        let completed = record
            .history
            .iter()
            .filter(|e| e.status == SwapStatus::Completed)
            .count();
        assert_eq!(completed, 1);
        for chain in ChainType::ALL {
            let claimed = record
                .history
                .iter()
                .filter(|e| e.status == chain.claimed_status())
                .count();
            assert_eq!(claimed, 1, "{chain} claim recorded once");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_swaps_initiated_in_parallel() {
        let h = Harness::new();
        const N: usize = 16;

        let results = join_all((0..N).map(|_| h.coordinator.initiate(swap_request()))).await;
        let ids: HashSet<_> = results
            .into_iter()
            .map(|r| r.unwrap().record.id)
            .collect();
        assert_eq!(ids.len(), N);

        let listed = h.coordinator.list_swaps().await.unwrap();
        assert_eq!(listed.len(), N);
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let report = reconcile_all(h.coordinator.as_ref()).await.unwrap();
        assert_eq!(report.scanned, N);
        assert_eq!(report.completed, 0);
        assert_eq!(report.errors, 0);
    }
}
