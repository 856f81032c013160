//! # Lifecycle Derivation
//!
//! The aggregate `status` is only the latest recorded transition. Real
//! per-leg state comes from the monitors, and `COMPLETED` is derived from
//! both of them here rather than asserted by whoever claimed last.

use crate::domain::{
    ChainType, EscrowMonitor, LegRecord, MonitorStatus, SwapAction, SwapEvent, SwapRecord,
    SwapStatus,
};
use serde::{Deserialize, Serialize};

/// Settlement state of one leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegState {
    /// No confirmed lock.
    NotLocked,
    /// Locked, awaiting claim or refund.
    Locked,
    /// Claimed by the taker.
    Claimed,
    /// Refunded to the maker.
    Refunded,
    /// Last settlement attempt failed.
    Failed,
}

impl LegState {
    /// Project a monitor (or its absence) into a leg state.
    pub fn from_monitor(monitor: Option<&EscrowMonitor>) -> Self {
        match monitor.map(|m| m.status) {
            None => LegState::NotLocked,
            Some(MonitorStatus::Pending) => LegState::Locked,
            Some(MonitorStatus::Resolved) => LegState::Claimed,
            Some(MonitorStatus::Canceled) => LegState::Refunded,
            Some(MonitorStatus::Failed) => LegState::Failed,
        }
    }
}

/// Both legs claimed.
pub fn is_completed(evm: LegState, xrpl: LegState) -> bool {
    evm == LegState::Claimed && xrpl == LegState::Claimed
}

/// Overall status from the record plus both monitors.
pub fn derive_status(
    swap: &SwapRecord,
    evm: Option<&EscrowMonitor>,
    xrpl: Option<&EscrowMonitor>,
) -> SwapStatus {
    if is_completed(LegState::from_monitor(evm), LegState::from_monitor(xrpl)) {
        SwapStatus::Completed
    } else {
        swap.status
    }
}

/// Settlement the monitor reports that the swap record has not caught up
/// with yet (store writes to the two records are independent).
pub fn pending_projection(leg: &LegRecord, monitor: &EscrowMonitor) -> Option<SwapAction> {
    match monitor.status {
        MonitorStatus::Resolved if leg.claim_tx.is_none() => Some(SwapAction::Claim),
        MonitorStatus::Canceled if leg.refund_tx.is_none() => Some(SwapAction::Refund),
        _ => None,
    }
}

/// Leg status as read from history alone, for front ends without monitor
/// access.
pub fn leg_status_from_history(history: &[SwapEvent], chain: ChainType) -> LegState {
    let mut state = LegState::NotLocked;
    for event in history {
        if event.status == chain.locked_status() {
            state = LegState::Locked;
        } else if event.status == chain.claimed_status() {
            state = LegState::Claimed;
        } else if event.status == chain.refunded_status() {
            state = LegState::Refunded;
        } else if event.status == SwapStatus::Failed
            && event.chain_type == Some(chain)
            && !matches!(state, LegState::Claimed | LegState::Refunded)
        {
            state = LegState::Failed;
        }
    }
    state
}

/// Number of FAILED entries recorded for `chain`.
pub fn failed_attempts(history: &[SwapEvent], chain: ChainType) -> usize {
    history
        .iter()
        .filter(|e| e.status == SwapStatus::Failed && e.chain_type == Some(chain))
        .count()
}

/// Seconds until each window of a leg opens, zero once open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCountdown {
    /// Until claim opens.
    pub claim_opens_in: u64,
    /// Until refund opens.
    pub refund_opens_in: u64,
}

/// Countdown for `leg` at `now`.
pub fn window_countdown(leg: &LegRecord, now: u64) -> WindowCountdown {
    WindowCountdown {
        claim_opens_in: leg.timelocks.public_withdrawal.saturating_sub(now),
        refund_opens_in: leg.timelocks.cancellation.saturating_sub(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LegTimelocks, MonitorEvent};
    use uuid::Uuid;

    fn monitor(chain: ChainType, status: MonitorStatus) -> EscrowMonitor {
        let mut m = EscrowMonitor::new(Uuid::nil(), chain, "0x01", [0; 32], 1600, 1000);
        if status != MonitorStatus::Pending {
            m.advance(MonitorEvent::new(1100, status)).unwrap();
        }
        m
    }

    #[test]
    fn test_completed_requires_both_legs_claimed() {
        let evm = monitor(ChainType::Evm, MonitorStatus::Resolved);
        let xrpl_pending = monitor(ChainType::Xrpl, MonitorStatus::Pending);
        let xrpl_done = monitor(ChainType::Xrpl, MonitorStatus::Resolved);

        assert!(!is_completed(
            LegState::from_monitor(Some(&evm)),
            LegState::from_monitor(Some(&xrpl_pending))
        ));
        assert!(is_completed(
            LegState::from_monitor(Some(&evm)),
            LegState::from_monitor(Some(&xrpl_done))
        ));
        assert_eq!(LegState::from_monitor(None), LegState::NotLocked);
    }

    #[test]
    fn test_history_distinguishes_failed_from_never_attempted() {
        let chain = ChainType::Xrpl;
        let never = vec![SwapEvent::new(1, SwapStatus::Initiated)];
        assert_eq!(leg_status_from_history(&never, chain), LegState::NotLocked);

        let failed = vec![
            SwapEvent::new(1, SwapStatus::Initiated),
            SwapEvent::new(2, SwapStatus::NonEvmEscrowLocked),
            SwapEvent::new(3, SwapStatus::Failed).on_chain(chain),
        ];
        assert_eq!(leg_status_from_history(&failed, chain), LegState::Failed);
        assert_eq!(leg_status_from_history(&failed, ChainType::Evm), LegState::NotLocked);
        assert_eq!(failed_attempts(&failed, chain), 1);

        let mut retried = failed.clone();
        retried.push(SwapEvent::new(4, SwapStatus::NonEvmClaimed).on_chain(chain));
        assert_eq!(leg_status_from_history(&retried, chain), LegState::Claimed);
    }

    #[test]
    fn test_pending_projection_spots_lagging_record() {
        let leg = LegRecord::new(ChainType::Evm, "0xa", "0xb", LegTimelocks::default());
        let resolved = monitor(ChainType::Evm, MonitorStatus::Resolved);
        assert_eq!(pending_projection(&leg, &resolved), Some(SwapAction::Claim));

        let mut caught_up = leg.clone();
        caught_up.claim_tx = Some("0x02".into());
        assert_eq!(pending_projection(&caught_up, &resolved), None);
    }

    #[test]
    fn test_window_countdown_saturates() {
        let leg = LegRecord::new(
            ChainType::Xrpl,
            "rA",
            "rB",
            LegTimelocks { public_withdrawal: 1030, cancellation: 1600 },
        );
        assert_eq!(
            window_countdown(&leg, 1000),
            WindowCountdown { claim_opens_in: 30, refund_opens_in: 600 }
        );
        assert_eq!(window_countdown(&leg, 2000).refund_opens_in, 0);
    }
}
