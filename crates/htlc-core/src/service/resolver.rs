//! # Resolver
//!
//! Decides whether a claim or refund may proceed on one leg and builds the
//! exact escrow call for it. Pure: no chain access, no store access. The
//! caller supplies the current time and the deployment timestamp it read
//! from the chain.
//!
//! ## Checks (in order)
//!
//! | Action | Caller | Secret | Window |
//! |--------|--------|--------|--------|
//! | claim  | leg taker | supplied or revealed, consistent with hashlock and condition | `now >= public withdrawal` |
//! | refund | leg maker | - | `now >= cancellation` |
//!
//! EVM windows are taken from the packed timelocks re-based on the on-chain
//! `deployedAt`, because that is what the escrow enforces.

use crate::algorithms::commitment::{encode_fulfillment, ensure_consistent};
use crate::algorithms::timelocks::Timelocks;
use crate::domain::{
    invariant_authorized_caller, invariant_window_open, to_ripple_time, ChainCall, ChainType,
    Confirmation, CoordinatorConfig, EscrowRef, EvmImmutables, Hash, LegTimelocks, Preimage,
    PreconditionFailure, SwapAction, SwapError, SwapEvent, SwapRecord, TimelockStage,
    TransactionRequest,
};
use serde_json::json;

/// Inputs for one claim / refund decision.
#[derive(Clone, Copy, Debug)]
pub struct ResolveContext<'a> {
    /// Swap being settled.
    pub swap: &'a SwapRecord,
    /// Leg.
    pub chain: ChainType,
    /// Claim or refund.
    pub action: SwapAction,
    /// Address asking.
    pub caller: &'a str,
    /// Current time (Unix seconds).
    pub now: u64,
    /// Secret supplied with a claim.
    pub secret: Option<&'a Preimage>,
    /// Deployment timestamp reported by the chain for the leg's escrow.
    pub onchain_deployed_at: u64,
}

/// Claim / refund decision logic.
#[derive(Clone, Debug)]
pub struct Resolver {
    order_hash: Hash,
    factory: String,
    src_cancellation_delay_secs: u64,
}

impl Resolver {
    /// Resolver using `config`'s order tag and factory.
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            order_hash: order_hash_from_tag(&config.order_tag),
            factory: config.evm_factory.clone(),
            src_cancellation_delay_secs: config.src_cancellation_delay_secs,
        }
    }

    /// `bytes32` order hash.
    pub fn order_hash(&self) -> Hash {
        self.order_hash
    }

    /// Packed destination schedule relative to `deployed_at`.
    pub fn destination_schedule(windows: &LegTimelocks, deployed_at: u64) -> Result<Timelocks, SwapError> {
        Ok(Timelocks::from_timestamps(
            deployed_at,
            &[
                (TimelockStage::DstWithdrawal, windows.public_withdrawal),
                (TimelockStage::DstCancellation, windows.cancellation),
            ],
        )?)
    }

    /// Windows the chain actually enforces for `chain`'s leg.
    pub fn effective_windows(
        swap: &SwapRecord,
        chain: ChainType,
        onchain_deployed_at: u64,
    ) -> Result<LegTimelocks, SwapError> {
        let leg = swap.leg(chain);
        match (chain, leg.packed_timelocks) {
            (ChainType::Evm, Some(packed)) => {
                let onchain = Timelocks::unpack(packed).with_deployed_at(onchain_deployed_at)?;
                Ok(LegTimelocks {
                    public_withdrawal: onchain
                        .timestamp(TimelockStage::DstWithdrawal)
                        .unwrap_or(leg.timelocks.public_withdrawal),
                    cancellation: onchain
                        .timestamp(TimelockStage::DstCancellation)
                        .unwrap_or(leg.timelocks.cancellation),
                })
            }
            _ => Ok(leg.timelocks),
        }
    }

    /// Escrow immutables for the EVM leg with the given packed timelocks.
    pub fn evm_immutables(&self, swap: &SwapRecord, timelocks: Timelocks) -> EvmImmutables {
        EvmImmutables {
            order_hash: self.order_hash,
            hashlock: swap.secret_hash,
            maker: swap.evm.maker.clone(),
            taker: swap.evm.taker.clone(),
            token: swap.token.clone(),
            amount: swap.evm_amount,
            safety_deposit: swap.safety_deposit,
            timelocks: timelocks.pack(),
        }
    }

    /// Lock request for one leg of a freshly created record.
    pub fn lock_request(
        &self,
        swap: &SwapRecord,
        chain: ChainType,
        now: u64,
    ) -> Result<TransactionRequest, SwapError> {
        let leg = swap.leg(chain);
        let call = match chain {
            ChainType::Evm => {
                let packed = leg.packed_timelocks.ok_or_else(|| {
                    SwapError::Validation(format!("swap {}: EVM schedule not packed", swap.id))
                })?;
                ChainCall::EvmCreateDstEscrow {
                    factory: self.factory.clone(),
                    immutables: self.evm_immutables(swap, Timelocks::unpack(packed)),
                    src_cancellation_timestamp: now + self.src_cancellation_delay_secs,
                    value: swap.safety_deposit,
                }
            }
            ChainType::Xrpl => ChainCall::LedgerEscrowCreate {
                destination: leg.taker.clone(),
                amount_drops: swap.xrpl_amount_drops,
                condition: swap.condition.clone(),
                finish_after: to_ripple_time(leg.timelocks.public_withdrawal)?,
                cancel_after: to_ripple_time(leg.timelocks.cancellation)?,
            },
        };
        Ok(TransactionRequest::new(leg.maker.clone(), call))
    }

    /// Run every precondition. Returns the secret a claim will reveal.
    pub fn check(&self, ctx: &ResolveContext<'_>) -> Result<Option<Preimage>, SwapError> {
        let leg = ctx.swap.leg(ctx.chain);
        if !leg.is_locked() {
            return Err(PreconditionFailure::LegNotLocked { chain: ctx.chain }.into());
        }

        // 1. Caller identity
        invariant_authorized_caller(ctx.chain, leg.party_for(ctx.action), ctx.caller)?;

        // 2. Secret (claim only)
        let secret = match ctx.action {
            SwapAction::Claim => {
                let secret = ctx
                    .secret
                    .or(ctx.swap.secret.as_ref())
                    .ok_or(PreconditionFailure::MissingSecret)?;
                ensure_consistent(secret, &ctx.swap.secret_hash, &ctx.swap.condition)?;
                Some(secret.clone())
            }
            SwapAction::Refund => None,
        };

        // 3. Window
        let windows = Self::effective_windows(ctx.swap, ctx.chain, ctx.onchain_deployed_at)?;
        let opens_at = match ctx.action {
            SwapAction::Claim => windows.public_withdrawal,
            SwapAction::Refund => windows.cancellation,
        };
        invariant_window_open(ctx.now, opens_at)?;

        Ok(secret)
    }

    /// Check preconditions and build the settlement call.
    pub fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<TransactionRequest, SwapError> {
        let secret = self.check(ctx)?;
        let leg = ctx.swap.leg(ctx.chain);
        let escrow = leg
            .escrow
            .as_ref()
            .ok_or(PreconditionFailure::LegNotLocked { chain: ctx.chain })?;

        let call = match (escrow, ctx.action, secret) {
            (EscrowRef::Evm { address }, action, secret) => {
                let packed = leg.packed_timelocks.ok_or_else(|| {
                    SwapError::Validation(format!("swap {}: EVM schedule not packed", ctx.swap.id))
                })?;
                let onchain = Timelocks::unpack(packed).with_deployed_at(ctx.onchain_deployed_at)?;
                let immutables = self.evm_immutables(ctx.swap, onchain);
                match (action, secret) {
                    (SwapAction::Claim, Some(secret)) => ChainCall::EvmWithdraw {
                        escrow: address.clone(),
                        secret,
                        immutables,
                    },
                    (SwapAction::Claim, None) => return Err(PreconditionFailure::MissingSecret.into()),
                    (SwapAction::Refund, _) => ChainCall::EvmCancel {
                        escrow: address.clone(),
                        immutables,
                    },
                }
            }
            (EscrowRef::Ledger { owner, sequence }, SwapAction::Claim, Some(secret)) => {
                ChainCall::LedgerEscrowFinish {
                    owner: owner.clone(),
                    offer_sequence: *sequence,
                    condition: ctx.swap.condition.clone(),
                    fulfillment: encode_fulfillment(&secret),
                }
            }
            (EscrowRef::Ledger { .. }, SwapAction::Claim, None) => {
                return Err(PreconditionFailure::MissingSecret.into())
            }
            (EscrowRef::Ledger { owner, sequence }, SwapAction::Refund, _) => {
                ChainCall::LedgerEscrowCancel {
                    owner: owner.clone(),
                    offer_sequence: *sequence,
                }
            }
        };

        Ok(TransactionRequest::new(ctx.caller, call))
    }

    /// Record a confirmed settlement: one history entry plus the leg's
    /// claim / refund hash. A claim also stores the secret it revealed.
    pub fn apply_success(
        swap: &mut SwapRecord,
        chain: ChainType,
        action: SwapAction,
        confirmation: &Confirmation,
        revealed: Option<Preimage>,
    ) -> Result<(), SwapError> {
        let details = json!({
            "action": action,
            "blockNumber": confirmation.block_number,
            "secretRevealed": action == SwapAction::Claim,
        });
        Self::record_settlement(
            swap,
            chain,
            action,
            &confirmation.tx_hash,
            confirmation.block_timestamp,
            details,
        )?;
        if let Some(secret) = revealed {
            if swap.secret.is_none() {
                swap.secret = Some(secret);
            }
        }
        Ok(())
    }

    /// Record a settlement the leg monitor already reports but the swap
    /// record missed.
    pub fn apply_observed(
        swap: &mut SwapRecord,
        chain: ChainType,
        action: SwapAction,
        tx_hash: &str,
        now: u64,
    ) -> Result<(), SwapError> {
        let details = json!({ "action": action, "source": "monitor" });
        Self::record_settlement(swap, chain, action, tx_hash, now, details)
    }

    fn record_settlement(
        swap: &mut SwapRecord,
        chain: ChainType,
        action: SwapAction,
        tx_hash: &str,
        timestamp: u64,
        details: serde_json::Value,
    ) -> Result<(), SwapError> {
        // Already replayed from the monitor.
        let recorded = match action {
            SwapAction::Claim => swap.leg(chain).claim_tx.as_deref(),
            SwapAction::Refund => swap.leg(chain).refund_tx.as_deref(),
        };
        if recorded == Some(tx_hash) {
            return Ok(());
        }
        let status = match action {
            SwapAction::Claim => chain.claimed_status(),
            SwapAction::Refund => chain.refunded_status(),
        };
        swap.record_transition(
            SwapEvent::new(timestamp, status)
                .on_chain(chain)
                .with_tx(tx_hash)
                .with_details(details),
        )?;
        let leg = swap.leg_mut(chain);
        match action {
            SwapAction::Claim => leg.claim_tx = Some(tx_hash.to_string()),
            SwapAction::Refund => leg.refund_tx = Some(tx_hash.to_string()),
        }
        Ok(())
    }

    /// FAILED entry for `operation` on `chain`.
    pub fn failure_event(chain: ChainType, operation: &str, error: &SwapError, now: u64) -> SwapEvent {
        let event = SwapEvent::failure(now, error)
            .on_chain(chain)
            .with_details(json!({
                "action": operation,
                "kind": error.kind(),
                "retryable": error.is_retryable(),
            }));
        match error {
            SwapError::ChainRevert { tx_hash, .. } => event.with_tx(tx_hash.clone()),
            _ => event,
        }
    }

    /// Record a failed attempt. Status is left as it was.
    pub fn apply_failure(
        swap: &mut SwapRecord,
        chain: ChainType,
        action: SwapAction,
        error: &SwapError,
        now: u64,
    ) {
        swap.record_failure(Self::failure_event(chain, &action.to_string(), error, now));
    }
}

/// Right-pad an ASCII tag into `bytes32`.
pub fn order_hash_from_tag(tag: &str) -> Hash {
    let mut hash = [0u8; 32];
    let bytes = tag.as_bytes();
    let len = bytes.len().min(32);
    hash[..len].copy_from_slice(&bytes[..len]);
    hash
}
