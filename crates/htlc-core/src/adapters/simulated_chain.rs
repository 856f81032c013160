//! Simulated chain client.
//!
//! Emulates both escrow families closely enough to exercise the
//! coordinator end to end:
//!
//! - EVM: the factory stamps `deployedAt` with the block timestamp, and
//!   `withdraw` / `cancel` revert unless the caller passes back identical
//!   immutables.
//! - Ledger: `EscrowFinish` checks the fulfillment against the stored
//!   condition, `FinishAfter` / `CancelAfter` are enforced in ledger time.
//!
//! Each escrow settles at most once. Submission failures, confirmation
//! delays and block inclusion lag can be injected.

use crate::algorithms::commitment::{decode_condition, decode_fulfillment, hashlock_of};
use crate::algorithms::timelocks::Timelocks;
use crate::domain::{
    to_ripple_time, BlockRef, ChainCall, ChainLog, ChainType, Confirmation, EvmImmutables,
    SwapError, TimelockStage, TransactionRequest, TxHash, TxStatus, DST_ESCROW_CREATED,
    ESCROW_CREATED,
};
use crate::ports::outbound::{ChainClient, TimeSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest as _, Sha256};
use sha3::Keccak256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

struct EvmEscrow {
    immutables: EvmImmutables,
    settled: bool,
}

struct LedgerEscrow {
    destination: String,
    condition: String,
    finish_after: u32,
    cancel_after: u32,
    settled: bool,
}

#[derive(Default)]
struct ChainState {
    height: u64,
    nonce: u64,
    block_times: HashMap<u64, u64>,
    receipts: HashMap<TxHash, Confirmation>,
    evm_escrows: HashMap<String, EvmEscrow>,
    ledger_escrows: HashMap<(String, u32), LedgerEscrow>,
    failing_submissions: u32,
    confirmation_delay: Option<Duration>,
    inclusion_lag_secs: u64,
    submitted: Vec<TransactionRequest>,
}

/// In-process chain for one family.
pub struct SimulatedChain {
    chain: ChainType,
    clock: Arc<dyn TimeSource>,
    state: Mutex<ChainState>,
}

impl SimulatedChain {
    /// Chain of `chain` family reading time from `clock`.
    pub fn new(chain: ChainType, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            chain,
            clock,
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Next `count` submissions fail with a transport error.
    pub fn fail_next_submissions(&self, count: u32) {
        self.state.lock().failing_submissions = count;
    }

    /// Delay before confirmations are reported.
    pub fn set_confirmation_delay(&self, delay: Option<Duration>) {
        self.state.lock().confirmation_delay = delay;
    }

    /// Blocks close `secs` after submission time.
    pub fn set_inclusion_lag(&self, secs: u64) {
        self.state.lock().inclusion_lag_secs = secs;
    }

    /// Every request accepted so far.
    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.state.lock().submitted.clone()
    }

    /// Number of successful settlements (withdraw / cancel / finish).
    pub fn settled_escrows(&self) -> usize {
        let state = self.state.lock();
        state.evm_escrows.values().filter(|e| e.settled).count()
            + state.ledger_escrows.values().filter(|e| e.settled).count()
    }

    fn tx_hash(&self, nonce: u64, method: &str) -> TxHash {
        match self.chain {
            ChainType::Evm => {
                let mut hasher = Keccak256::new();
                hasher.update(b"evm-tx");
                hasher.update(nonce.to_be_bytes());
                hasher.update(method.as_bytes());
                format!("0x{}", hex::encode(hasher.finalize()))
            }
            ChainType::Xrpl => {
                let mut hasher = Sha256::new();
                hasher.update(b"ledger-tx");
                hasher.update(nonce.to_be_bytes());
                hasher.update(method.as_bytes());
                hex::encode_upper(hasher.finalize())
            }
        }
    }

    fn execute(
        state: &mut ChainState,
        request: &TransactionRequest,
        nonce: u64,
        block_time: u64,
    ) -> Result<Vec<ChainLog>, String> {
        match &request.call {
            ChainCall::EvmCreateDstEscrow {
                immutables, value, ..
            } => {
                if *value != immutables.safety_deposit {
                    return Err("InsufficientEscrowBalance".into());
                }
                let onchain = Timelocks::unpack(immutables.timelocks)
                    .with_deployed_at(block_time)
                    .map_err(|e| e.to_string())?;
                let mut stored = immutables.clone();
                stored.timelocks = onchain.pack();

                let mut hasher = Keccak256::new();
                hasher.update(stored.order_hash);
                hasher.update(stored.hashlock);
                hasher.update(nonce.to_be_bytes());
                let digest = hasher.finalize();
                let address = format!("0x{}", hex::encode(&digest[12..]));

                state.evm_escrows.insert(
                    address.clone(),
                    EvmEscrow {
                        immutables: stored,
                        settled: false,
                    },
                );
                Ok(vec![ChainLog::new(DST_ESCROW_CREATED)
                    .with_field("escrow", address)
                    .with_field("deployedAt", block_time.to_string())])
            }
            ChainCall::EvmWithdraw {
                escrow,
                secret,
                immutables,
            } => {
                let entry = Self::open_evm_escrow(state, escrow, immutables)?;
                if !ChainType::Evm.same_address(&request.from, &entry.immutables.taker) {
                    return Err("InvalidCaller".into());
                }
                if hashlock_of(secret) != entry.immutables.hashlock {
                    return Err("InvalidSecret".into());
                }
                let timelocks = Timelocks::unpack(entry.immutables.timelocks);
                let opens = timelocks.timestamp(TimelockStage::DstWithdrawal).unwrap_or(0);
                let closes = timelocks
                    .timestamp(TimelockStage::DstCancellation)
                    .unwrap_or(u64::MAX);
                if block_time < opens || block_time >= closes {
                    return Err("InvalidTime".into());
                }
                entry.settled = true;
                Ok(vec![ChainLog::new("EscrowWithdrawal").with_field("secret", secret.to_evm_hex())])
            }
            ChainCall::EvmCancel { escrow, immutables } => {
                let entry = Self::open_evm_escrow(state, escrow, immutables)?;
                if !ChainType::Evm.same_address(&request.from, &entry.immutables.maker) {
                    return Err("InvalidCaller".into());
                }
                let opens = Timelocks::unpack(entry.immutables.timelocks)
                    .timestamp(TimelockStage::DstCancellation)
                    .unwrap_or(0);
                if block_time < opens {
                    return Err("InvalidTime".into());
                }
                entry.settled = true;
                Ok(vec![ChainLog::new("EscrowCancelled")])
            }
            ChainCall::LedgerEscrowCreate {
                destination,
                condition,
                finish_after,
                cancel_after,
                ..
            } => {
                if finish_after >= cancel_after {
                    return Err("temBAD_EXPIRATION".into());
                }
                decode_condition(condition).map_err(|_| "temMALFORMED".to_string())?;
                let sequence = nonce as u32;
                state.ledger_escrows.insert(
                    (request.from.clone(), sequence),
                    LedgerEscrow {
                        destination: destination.clone(),
                        condition: condition.clone(),
                        finish_after: *finish_after,
                        cancel_after: *cancel_after,
                        settled: false,
                    },
                );
                Ok(vec![ChainLog::new(ESCROW_CREATED)
                    .with_field("owner", request.from.clone())
                    .with_field("sequence", sequence.to_string())])
            }
            ChainCall::LedgerEscrowFinish {
                owner,
                offer_sequence,
                condition,
                fulfillment,
            } => {
                let now = to_ripple_time(block_time).map_err(|e| e.to_string())?;
                let entry = state
                    .ledger_escrows
                    .get_mut(&(owner.clone(), *offer_sequence))
                    .filter(|e| !e.settled)
                    .ok_or_else(|| "tecNO_TARGET".to_string())?;
                if now < entry.finish_after || now >= entry.cancel_after {
                    return Err("tecNO_PERMISSION".into());
                }
                let digest = decode_condition(condition).map_err(|_| "temMALFORMED".to_string())?;
                let secret = decode_fulfillment(fulfillment)
                    .map_err(|_| "tecCRYPTOCONDITION_ERROR".to_string())?;
                if *condition != entry.condition || hashlock_of(&secret) != digest {
                    return Err("tecCRYPTOCONDITION_ERROR".into());
                }
                entry.settled = true;
                Ok(vec![ChainLog::new("EscrowFinished")
                    .with_field("destination", entry.destination.clone())
                    .with_field("fulfillment", fulfillment.clone())])
            }
            ChainCall::LedgerEscrowCancel {
                owner,
                offer_sequence,
            } => {
                let now = to_ripple_time(block_time).map_err(|e| e.to_string())?;
                let entry = state
                    .ledger_escrows
                    .get_mut(&(owner.clone(), *offer_sequence))
                    .filter(|e| !e.settled)
                    .ok_or_else(|| "tecNO_TARGET".to_string())?;
                if now < entry.cancel_after {
                    return Err("tecNO_PERMISSION".into());
                }
                entry.settled = true;
                Ok(vec![ChainLog::new("EscrowCanceled")])
            }
        }
    }

    fn open_evm_escrow<'a>(
        state: &'a mut ChainState,
        escrow: &str,
        immutables: &EvmImmutables,
    ) -> Result<&'a mut EvmEscrow, String> {
        let entry = state
            .evm_escrows
            .get_mut(&escrow.to_ascii_lowercase())
            .ok_or_else(|| "EscrowNotFound".to_string())?;
        if entry.settled {
            return Err("EscrowAlreadySettled".into());
        }
        if entry.immutables != *immutables {
            return Err("InvalidImmutables".into());
        }
        Ok(entry)
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    fn chain(&self) -> ChainType {
        self.chain
    }

    async fn submit(&self, request: &TransactionRequest) -> Result<TxHash, SwapError> {
        if request.chain != self.chain {
            return Err(SwapError::Validation(format!(
                "{} request sent to {} client",
                request.chain, self.chain
            )));
        }

        let mut state = self.state.lock();
        if state.failing_submissions > 0 {
            state.failing_submissions -= 1;
            return Err(SwapError::ChainSubmission {
                chain: self.chain,
                message: "connection reset by peer".into(),
            });
        }

        state.height += 1;
        state.nonce += 1;
        let (height, nonce) = (state.height, state.nonce);
        let block_time = self.clock.now() + state.inclusion_lag_secs;
        state.block_times.insert(height, block_time);

        let tx_hash = self.tx_hash(nonce, request.call.method());
        let (status, logs) = match Self::execute(&mut state, request, nonce, block_time) {
            Ok(logs) => (TxStatus::Success, logs),
            Err(reason) => (TxStatus::Reverted { reason }, Vec::new()),
        };
        debug!(
            "[htlc] {} {} included in block {} -> {:?}",
            self.chain,
            request.call.method(),
            height,
            status
        );

        state.receipts.insert(
            tx_hash.clone(),
            Confirmation {
                tx_hash: tx_hash.clone(),
                status,
                block_number: height,
                block_timestamp: block_time,
                logs,
            },
        );
        state.submitted.push(request.clone());
        Ok(tx_hash)
    }

    async fn await_confirmation(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> Result<Confirmation, SwapError> {
        let delay = self.state.lock().confirmation_delay;
        if let Some(delay) = delay {
            if tokio::time::timeout(timeout, tokio::time::sleep(delay))
                .await
                .is_err()
            {
                return Err(SwapError::Timeout {
                    operation: format!("await_confirmation({tx_hash})"),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }

        self.state
            .lock()
            .receipts
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| SwapError::ChainSubmission {
                chain: self.chain,
                message: format!("unknown transaction {tx_hash}"),
            })
    }

    async fn get_block_timestamp(&self, block: BlockRef) -> Result<u64, SwapError> {
        let state = self.state.lock();
        match block {
            BlockRef::Latest => Ok(self.clock.now() + state.inclusion_lag_secs),
            BlockRef::Number(n) => {
                state
                    .block_times
                    .get(&n)
                    .copied()
                    .ok_or_else(|| SwapError::ChainSubmission {
                        chain: self.chain,
                        message: format!("unknown block {n}"),
                    })
            }
        }
    }
}
