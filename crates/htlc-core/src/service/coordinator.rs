//! # Swap Coordinator
//!
//! Drives a swap from commitment to settlement:
//!
//! ```text
//! initiate ──► generate commitment ──► store INITIATED
//!                                  ├─► lock EVM leg    ─┐  (tokio::join!)
//!                                  └─► lock ledger leg ─┘
//! claim / refund ──► monitor gate ──► resolver ──► submit + confirm
//!                                                  ├─► monitor RESOLVED / CANCELED
//!                                                  └─► swap history + tx hash
//! reconcile ──► read both monitors ──► repair swap record ──► derive COMPLETED
//! ```
//!
//! Every error raised once a swap record exists is written to its history
//! as a FAILED entry before it is returned.

use super::resolver::{ResolveContext, Resolver};
use super::retry::{with_backoff, with_backoff_when, RetryPolicy};
use crate::algorithms::commitment::{ensure_consistent, SecretCommitment};
use crate::algorithms::lifecycle::{derive_status, pending_projection};
use crate::domain::{
    invariant_after_deployment, to_ripple_time, ActionOutcome, BlockRef, ChainType, Confirmation,
    CoordinatorConfig, EscrowMonitor, EscrowRef, InitiatedSwap, LegRecord, LegTimelocks,
    MonitorEvent, MonitorStatus, PreconditionFailure, Preimage, SwapAction, SwapError, SwapEvent,
    SwapRecord, SwapRequest, SwapStatus, TransactionRequest, TxStatus, DST_ESCROW_CREATED,
    ESCROW_CREATED,
};
use crate::ports::inbound::SwapApi;
use crate::ports::outbound::{ChainClient, RecordStore, TimeSource};
use async_trait::async_trait;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Swap coordinator service.
///
/// Chain clients and stores are injected; the coordinator keeps no ambient
/// connection state of its own.
pub struct SwapCoordinator<E, L, S: ?Sized, M: ?Sized>
where
    E: ChainClient,
    L: ChainClient,
    S: RecordStore<SwapRecord>,
    M: RecordStore<EscrowMonitor>,
{
    evm: Arc<E>,
    xrpl: Arc<L>,
    swaps: Arc<S>,
    monitors: Arc<M>,
    clock: Arc<dyn TimeSource>,
    resolver: Resolver,
    config: CoordinatorConfig,
}

impl<E, L, S, M> SwapCoordinator<E, L, S, M>
where
    E: ChainClient + 'static,
    L: ChainClient + 'static,
    S: RecordStore<SwapRecord> + ?Sized + 'static,
    M: RecordStore<EscrowMonitor> + ?Sized + 'static,
{
    /// Wire a coordinator. Fails if `config` is inconsistent or a client
    /// serves the wrong chain family.
    pub fn new(
        evm: Arc<E>,
        xrpl: Arc<L>,
        swaps: Arc<S>,
        monitors: Arc<M>,
        clock: Arc<dyn TimeSource>,
        config: CoordinatorConfig,
    ) -> Result<Self, SwapError> {
        config.validate()?;
        if evm.chain() != ChainType::Evm || xrpl.chain() != ChainType::Xrpl {
            return Err(SwapError::Validation(format!(
                "chain clients wired as ({}, {}), expected (EVM, XRPL)",
                evm.chain(),
                xrpl.chain()
            )));
        }
        Ok(Self {
            evm,
            xrpl,
            swaps,
            monitors,
            clock,
            resolver: Resolver::new(&config),
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Resolver used for claim / refund decisions.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn client(&self, chain: ChainType) -> &dyn ChainClient {
        match chain {
            ChainType::Evm => self.evm.as_ref(),
            ChainType::Xrpl => self.xrpl.as_ref(),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.submission_attempts,
            base_delay: self.config.backoff_base,
        }
    }

    // =========================================================================
    // Chain I/O
    // =========================================================================

    /// Submit with retry, then wait for inclusion. A revert is an error.
    ///
    /// Only transport failures are resubmitted. A submit that times out may
    /// already have been broadcast, so it surfaces as a retryable leg
    /// failure instead.
    async fn submit_and_confirm(
        &self,
        request: &TransactionRequest,
    ) -> Result<Confirmation, SwapError> {
        let client = self.client(request.chain);
        let method = request.call.method();
        let submit_limit = self.config.submission_timeout;

        let tx_hash = with_backoff_when(
            self.retry_policy(),
            method,
            SwapError::is_resubmittable,
            || async move {
                with_deadline(&format!("submit {method}"), submit_limit, client.submit(request)).await
            },
        )
        .await?;
        debug!("[htlc] {} {} submitted as {}", request.chain, method, tx_hash);

        let confirm_limit = self.config.confirmation_timeout;
        let confirmation = with_deadline(
            &format!("await_confirmation({tx_hash})"),
            confirm_limit,
            client.await_confirmation(&tx_hash, confirm_limit),
        )
        .await?;

        match &confirmation.status {
            TxStatus::Success => Ok(confirmation),
            TxStatus::Reverted { reason } => Err(SwapError::ChainRevert {
                chain: request.chain,
                tx_hash: confirmation.tx_hash.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Deployment time of a leg's escrow as reported by its chain.
    async fn onchain_deployed_at(&self, swap: &SwapRecord, chain: ChainType) -> Result<u64, SwapError> {
        let block = swap
            .leg(chain)
            .create_block
            .ok_or(PreconditionFailure::LegNotLocked { chain })?;
        with_deadline(
            &format!("get_block_timestamp({block})"),
            self.config.submission_timeout,
            self.client(chain).get_block_timestamp(BlockRef::Number(block)),
        )
        .await
    }

    // =========================================================================
    // Store I/O
    // =========================================================================

    async fn update_swap<F>(&self, swap_id: Uuid, mutation: F) -> Result<SwapRecord, SwapError>
    where
        F: Fn(&mut SwapRecord) -> Result<(), SwapError> + Clone + Send + Sync + 'static,
    {
        let key = swap_id.to_string();
        let key = key.as_str();
        let store = &self.swaps;
        with_backoff(self.retry_policy(), "swap store upsert", || {
            let mutation = mutation.clone();
            async move { store.upsert(key, Box::new(mutation)).await }
        })
        .await
    }

    async fn update_monitor<F>(&self, key: &str, mutation: F) -> Result<EscrowMonitor, SwapError>
    where
        F: Fn(&mut EscrowMonitor) -> Result<(), SwapError> + Clone + Send + Sync + 'static,
    {
        let store = &self.monitors;
        with_backoff(self.retry_policy(), "monitor store upsert", || {
            let mutation = mutation.clone();
            async move { store.upsert(key, Box::new(mutation)).await }
        })
        .await
    }

    async fn find_monitor(&self, swap_id: Uuid, chain: ChainType) -> Result<Option<EscrowMonitor>, SwapError> {
        match self.monitors.get(&EscrowMonitor::key_for(swap_id, chain)).await {
            Ok(monitor) => Ok(Some(monitor)),
            Err(SwapError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Append a FAILED entry. A store outage here is logged, since the
    /// original error is the one the caller needs.
    async fn record_failure(&self, swap_id: Uuid, chain: ChainType, operation: &'static str, error: &SwapError) {
        let now = self.clock.now();
        let event = Resolver::failure_event(chain, operation, error, now);
        if let Err(store_err) = self
            .update_swap(swap_id, move |swap| {
                swap.record_failure(event.clone());
                Ok(())
            })
            .await
        {
            warn!(
                "[htlc] swap {}: could not record {} failure on {} ({}): {}",
                swap_id, operation, chain, error, store_err
            );
        }

        if !error.is_chain_failure() {
            return;
        }
        let key = EscrowMonitor::key_for(swap_id, chain);
        let chain_error = error.clone();
        let result = self
            .update_monitor(&key, move |monitor| {
                if monitor.status.is_terminal() {
                    return Ok(());
                }
                monitor.mark_failed(now, &chain_error)
            })
            .await;
        match result {
            Ok(_) | Err(SwapError::NotFound(_)) => {}
            Err(store_err) => warn!("[htlc] monitor {}: could not mark FAILED: {}", key, store_err),
        }
    }

    // =========================================================================
    // Initiation
    // =========================================================================

    fn build_record(
        &self,
        request: SwapRequest,
        commitment: &SecretCommitment,
        now: u64,
    ) -> Result<SwapRecord, SwapError> {
        let defaults = LegTimelocks {
            public_withdrawal: now + self.config.withdrawal_delay_secs,
            cancellation: now + self.config.cancellation_delay_secs,
        };
        let evm_windows = request.evm_windows.unwrap_or(defaults);
        let xrpl_windows = request.xrpl_windows.unwrap_or(defaults);
        invariant_after_deployment(ChainType::Evm, &evm_windows, now)?;
        invariant_after_deployment(ChainType::Xrpl, &xrpl_windows, now)?;
        to_ripple_time(xrpl_windows.public_withdrawal)?;
        to_ripple_time(xrpl_windows.cancellation)?;

        let mut evm = LegRecord::new(ChainType::Evm, request.evm_maker, request.evm_taker, evm_windows);
        evm.packed_timelocks = Some(Resolver::destination_schedule(&evm_windows, now)?.pack());
        let xrpl = LegRecord::new(ChainType::Xrpl, request.xrpl_maker, request.xrpl_taker, xrpl_windows);

        Ok(SwapRecord {
            id: Uuid::new_v4(),
            status: SwapStatus::Initiated,
            evm,
            xrpl,
            token: request.token,
            evm_amount: request.evm_amount,
            safety_deposit: request.safety_deposit,
            xrpl_amount_drops: request.xrpl_amount_drops,
            evm_chain_id: request.evm_chain_id,
            secret_hash: commitment.hashlock(),
            condition: commitment.condition().to_string(),
            secret: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            history: vec![SwapEvent::new(now, SwapStatus::Initiated).with_details(json!({
                "evmChainId": request.evm_chain_id,
                "hashlock": hex::encode(commitment.hashlock()),
            }))],
        })
    }

    async fn lock_leg(&self, swap: &SwapRecord, chain: ChainType) -> Result<(), SwapError> {
        let result = self.try_lock_leg(swap, chain).await;
        if let Err(err) = &result {
            warn!("[htlc] swap {}: {} lock failed: {}", swap.id, chain, err);
            self.record_failure(swap.id, chain, "lock", err).await;
        }
        result
    }

    async fn try_lock_leg(&self, swap: &SwapRecord, chain: ChainType) -> Result<(), SwapError> {
        let request = self.resolver.lock_request(swap, chain, self.clock.now())?;
        let confirmation = self.submit_and_confirm(&request).await?;
        let (escrow, deployed_at) = escrow_from_receipt(chain, &confirmation)?;
        let windows = Resolver::effective_windows(swap, chain, deployed_at)?;

        let now = self.clock.now();
        let tx_hash = confirmation.tx_hash.clone();
        let block = confirmation.block_number;
        {
            let escrow = escrow.clone();
            let tx_hash = tx_hash.clone();
            self.update_swap(swap.id, move |record| {
                let leg = record.leg_mut(chain);
                leg.escrow = Some(escrow.clone());
                leg.create_block = Some(block);
                leg.create_tx = Some(tx_hash.clone());
                record.record_transition(
                    SwapEvent::new(now, chain.locked_status())
                        .on_chain(chain)
                        .with_tx(tx_hash.clone())
                        .with_details(json!({ "blockNumber": block, "deployedAt": deployed_at })),
                )
            })
            .await?;
        }

        let monitor = EscrowMonitor::new(swap.id, chain, tx_hash.clone(), swap.secret_hash, windows.cancellation, now);
        let store = &self.monitors;
        with_backoff(self.retry_policy(), "monitor store insert", || {
            let monitor = monitor.clone();
            async move { store.insert(monitor).await }
        })
        .await?;

        info!(
            swap_id = %swap.id,
            chain = %chain,
            tx_hash = %tx_hash,
            "[htlc] {} leg locked ({:?})",
            chain,
            escrow
        );
        Ok(())
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    async fn execute(
        &self,
        swap_id: Uuid,
        chain: ChainType,
        action: SwapAction,
        caller: &str,
        secret: Option<Preimage>,
    ) -> Result<ActionOutcome, SwapError> {
        let swap = self.swaps.get(&swap_id.to_string()).await?;
        match self.settle(&swap, chain, action, caller, secret).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(
                    swap_id = %swap_id,
                    chain = %chain,
                    "[htlc] {} failed: {}",
                    action,
                    err
                );
                let operation = match action {
                    SwapAction::Claim => "claim",
                    SwapAction::Refund => "refund",
                };
                self.record_failure(swap_id, chain, operation, &err).await;
                Err(err)
            }
        }
    }

    async fn settle(
        &self,
        swap: &SwapRecord,
        chain: ChainType,
        action: SwapAction,
        caller: &str,
        secret: Option<Preimage>,
    ) -> Result<ActionOutcome, SwapError> {
        // No resubmission for a leg that is already settled.
        let monitor = self
            .find_monitor(swap.id, chain)
            .await?
            .ok_or(PreconditionFailure::LegNotLocked { chain })?;
        if monitor.status.is_terminal() {
            return Err(PreconditionFailure::LegSettled { chain, status: monitor.status }.into());
        }
        if monitor.status == MonitorStatus::Failed && monitor.retry_count >= self.config.max_leg_retries {
            return Err(PreconditionFailure::RetriesExhausted {
                chain,
                retries: monitor.retry_count,
                max: self.config.max_leg_retries,
            }
            .into());
        }

        let onchain_deployed_at = self.onchain_deployed_at(swap, chain).await?;
        let ctx = ResolveContext {
            swap,
            chain,
            action,
            caller,
            now: self.clock.now(),
            secret: secret.as_ref(),
            onchain_deployed_at,
        };
        let request = self.resolver.resolve(&ctx)?;
        let revealed = match action {
            SwapAction::Claim => secret.or_else(|| swap.secret.clone()),
            SwapAction::Refund => None,
        };

        let confirmation = self.submit_and_confirm(&request).await?;
        let tx_hash = confirmation.tx_hash.clone();
        let now = self.clock.now();

        // Monitor first: if the swap write is lost, reconciliation can
        // still replay it from the monitor.
        let settled = MonitorEvent::new(now, action.settled_monitor_status())
            .with_tx(tx_hash.clone())
            .with_details(json!({ "action": action, "blockNumber": confirmation.block_number }));
        self.update_monitor(&monitor.key(), move |m| m.advance(settled.clone()))
            .await?;
        self.update_swap(swap.id, move |record| {
            Resolver::apply_success(record, chain, action, &confirmation, revealed.clone())
        })
        .await?;

        info!(
            swap_id = %swap.id,
            chain = %chain,
            tx_hash = %tx_hash,
            "[htlc] {} confirmed",
            action
        );

        let status = match self.reconcile(swap.id).await {
            Ok(record) => record.status,
            Err(err) => {
                warn!("[htlc] swap {}: reconcile after {} failed: {}", swap.id, action, err);
                self.swaps.get(&swap.id.to_string()).await?.status
            }
        };
        Ok(ActionOutcome {
            swap_id: swap.id,
            chain,
            action,
            tx_hash,
            status,
        })
    }

    async fn try_reveal(&self, swap: &SwapRecord, secret: Preimage) -> Result<SwapRecord, SwapError> {
        ensure_consistent(&secret, &swap.secret_hash, &swap.condition)?;
        if swap.secret.is_some() {
            return Ok(swap.clone());
        }
        // The secret becomes public with the first claim. Before that it
        // stays out of the store.
        let claimed = self
            .monitors_for(swap.id)
            .await?
            .iter()
            .any(|m| m.status == MonitorStatus::Resolved);
        if !claimed {
            return Err(PreconditionFailure::NoClaimObserved.into());
        }
        let now = self.clock.now();
        self.update_swap(swap.id, move |record| {
            if record.secret.is_some() {
                return Ok(());
            }
            record.record_transition(
                SwapEvent::new(now, SwapStatus::SecretRevealed)
                    .with_details(json!({ "secretRevealed": true })),
            )?;
            record.secret = Some(secret.clone());
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    async fn try_reconcile(&self, swap: SwapRecord) -> Result<SwapRecord, SwapError> {
        let now = self.clock.now();
        let mut monitors = [None, None];
        for (slot, chain) in monitors.iter_mut().zip(ChainType::ALL) {
            if self.find_monitor(swap.id, chain).await?.is_some() {
                let touched = self
                    .update_monitor(&EscrowMonitor::key_for(swap.id, chain), move |m| {
                        m.touch(now);
                        Ok(())
                    })
                    .await?;
                *slot = Some(touched);
            }
        }
        let [evm, xrpl] = monitors;

        let repairs: Vec<(ChainType, SwapAction, String)> = [(ChainType::Evm, &evm), (ChainType::Xrpl, &xrpl)]
            .into_iter()
            .filter_map(|(chain, monitor)| {
                let monitor = monitor.as_ref()?;
                let action = pending_projection(swap.leg(chain), monitor)?;
                Some((chain, action, monitor.latest_tx()?.to_string()))
            })
            .collect();
        let derived = derive_status(&swap, evm.as_ref(), xrpl.as_ref());

        if repairs.is_empty() && derived == swap.status {
            return Ok(swap);
        }
        for (chain, action, tx) in &repairs {
            info!(
                swap_id = %swap.id,
                chain = %chain,
                "[htlc] replaying {} {} from monitor ({})",
                chain,
                action,
                tx
            );
        }

        self.update_swap(swap.id, move |record| {
            for (chain, action, tx) in &repairs {
                let leg = record.leg(*chain);
                let missing = match action {
                    SwapAction::Claim => leg.claim_tx.is_none(),
                    SwapAction::Refund => leg.refund_tx.is_none(),
                };
                if missing {
                    Resolver::apply_observed(record, *chain, *action, tx, now)?;
                }
            }
            if derived == SwapStatus::Completed && record.status != SwapStatus::Completed {
                record.record_transition(
                    SwapEvent::new(now, SwapStatus::Completed)
                        .with_details(json!({ "derivedFrom": "monitors" })),
                )?;
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl<E, L, S, M> SwapApi for SwapCoordinator<E, L, S, M>
where
    E: ChainClient + 'static,
    L: ChainClient + 'static,
    S: RecordStore<SwapRecord> + ?Sized + 'static,
    M: RecordStore<EscrowMonitor> + ?Sized + 'static,
{
    async fn initiate(&self, request: SwapRequest) -> Result<InitiatedSwap, SwapError> {
        request.validate()?;
        let now = self.clock.now();
        let commitment = SecretCommitment::generate();
        let record = self.build_record(request, &commitment, now)?;

        let store = &self.swaps;
        let record = with_backoff(self.retry_policy(), "swap store insert", || {
            let record = record.clone();
            async move { store.insert(record).await }
        })
        .await?;
        info!(swap_id = %record.id, "[htlc] swap initiated, locking both legs");

        let (evm_locked, xrpl_locked) = tokio::join!(
            self.lock_leg(&record, ChainType::Evm),
            self.lock_leg(&record, ChainType::Xrpl)
        );
        evm_locked?;
        xrpl_locked?;

        let record = self.swaps.get(&record.id.to_string()).await?;
        Ok(InitiatedSwap {
            record,
            secret: commitment.into_secret(),
        })
    }

    async fn claim(
        &self,
        swap_id: Uuid,
        chain: ChainType,
        caller: &str,
        secret: Option<Preimage>,
    ) -> Result<ActionOutcome, SwapError> {
        self.execute(swap_id, chain, SwapAction::Claim, caller, secret).await
    }

    async fn refund(
        &self,
        swap_id: Uuid,
        chain: ChainType,
        caller: &str,
    ) -> Result<ActionOutcome, SwapError> {
        self.execute(swap_id, chain, SwapAction::Refund, caller, None).await
    }

    async fn reveal_secret(&self, swap_id: Uuid, secret: Preimage) -> Result<SwapRecord, SwapError> {
        let swap = self.swaps.get(&swap_id.to_string()).await?;
        match self.try_reveal(&swap, secret).await {
            Ok(record) => Ok(record),
            Err(err) => {
                let now = self.clock.now();
                let event = SwapEvent::failure(now, &err)
                    .with_details(json!({ "action": "reveal", "kind": err.kind() }));
                if let Err(store_err) = self
                    .update_swap(swap_id, move |record| {
                        record.record_failure(event.clone());
                        Ok(())
                    })
                    .await
                {
                    warn!("[htlc] swap {}: could not record reveal failure: {}", swap_id, store_err);
                }
                Err(err)
            }
        }
    }

    async fn get_swap(&self, swap_id: Uuid) -> Result<SwapRecord, SwapError> {
        self.swaps.get(&swap_id.to_string()).await
    }

    async fn list_swaps(&self) -> Result<Vec<SwapRecord>, SwapError> {
        let mut swaps = self.swaps.list().await?;
        swaps.sort_by_key(|s| (s.created_at, s.id));
        Ok(swaps)
    }

    async fn monitors_for(&self, swap_id: Uuid) -> Result<Vec<EscrowMonitor>, SwapError> {
        let mut found = Vec::with_capacity(2);
        for chain in ChainType::ALL {
            if let Some(monitor) = self.find_monitor(swap_id, chain).await? {
                found.push(monitor);
            }
        }
        Ok(found)
    }

    async fn reconcile(&self, swap_id: Uuid) -> Result<SwapRecord, SwapError> {
        let swap = self.swaps.get(&swap_id.to_string()).await?;
        self.try_reconcile(swap).await
    }
}

/// Run `fut` under `limit`, mapping expiry to `SwapError::Timeout`.
async fn with_deadline<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, SwapError>
where
    F: Future<Output = Result<T, SwapError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SwapError::Timeout {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

/// Escrow location and deployment time from a lock receipt.
fn escrow_from_receipt(chain: ChainType, confirmation: &Confirmation) -> Result<(EscrowRef, u64), SwapError> {
    let missing = |what: &str| SwapError::ChainRevert {
        chain,
        tx_hash: confirmation.tx_hash.clone(),
        reason: format!("receipt has no {what}"),
    };
    match chain {
        ChainType::Evm => {
            let log = confirmation
                .find_log(DST_ESCROW_CREATED)
                .ok_or_else(|| missing(DST_ESCROW_CREATED))?;
            let address = log.field("escrow").ok_or_else(|| missing("escrow address"))?;
            let deployed_at = log
                .field("deployedAt")
                .and_then(|v| v.parse().ok())
                .unwrap_or(confirmation.block_timestamp);
            Ok((EscrowRef::Evm { address: address.to_string() }, deployed_at))
        }
        ChainType::Xrpl => {
            let log = confirmation
                .find_log(ESCROW_CREATED)
                .ok_or_else(|| missing(ESCROW_CREATED))?;
            let owner = log.field("owner").ok_or_else(|| missing("escrow owner"))?;
            let sequence = log
                .field("sequence")
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| missing("offer sequence"))?;
            Ok((
                EscrowRef::Ledger { owner: owner.to_string(), sequence },
                confirmation.block_timestamp,
            ))
        }
    }
}
