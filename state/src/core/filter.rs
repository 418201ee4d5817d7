//! Transaction admission filter.
//!
//! Pure function of a candidate set and a read snapshot of the state
//! store: iteratively strips already-included, malformed, replayed and
//! overdrafting transactions until the surviving set is stable. Two nodes
//! looking at the same state and the same candidates admit the same set.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use indexmap::IndexMap;
use log::{debug, trace};

use spos_common::{
    block::Height,
    config::{GENESIS_HEIGHT, MAX_FILTER_ITERATIONS, TIMESTAMP_CHECK_EPOCH},
    crypto::{Address, Signature},
    time::TimestampMillis,
    transaction::{PaymentPayload, Transaction, TransactionType},
};

use crate::core::{error::LedgerError, storage::Storage};

// Validate candidates against the state at `height` (current height when
// not given) and return the admitted subset. Never fails on invalid
// transactions, only on substrate errors.
pub async fn validate<S: Storage>(
    storage: &S,
    candidates: &[Arc<Transaction>],
    height: Option<Height>,
) -> Result<Vec<Arc<Transaction>>, LedgerError> {
    let at_height = match height {
        Some(height) => height,
        None => storage.get_state_height().await?,
    };

    let mut current: Vec<Arc<Transaction>> = candidates.to_vec();

    // Each round either returns or strictly shrinks the candidate set, so
    // the input size bounds the number of rounds
    for _ in 0..=candidates.len().min(MAX_FILTER_ITERATIONS) {
        let txs = pass_structural(storage, &current, at_height).await?;
        let by_timestamp = pass_batch_timestamps(storage, &txs).await?;
        let solvent = pass_overdraft(storage, &by_timestamp, at_height).await?;

        // Stable set: nothing was dropped after the structural pass. The
        // structural output is returned here; equal counts imply equal
        // sets since every pass only removes elements.
        if solvent.len() == txs.len() {
            return Ok(txs);
        }

        current = solvent;
    }

    Ok(current)
}

// Pass A: drop already-included transactions and anything structurally
// invalid at this height
async fn pass_structural<S: Storage>(
    storage: &S,
    txs: &[Arc<Transaction>],
    at_height: Height,
) -> Result<Vec<Arc<Transaction>>, LedgerError> {
    let mut valid = Vec::with_capacity(txs.len());
    for tx in txs {
        if storage.is_included(tx.get_signature(), None).await?.is_some() {
            if log::log_enabled!(log::Level::Debug) {
                debug!("dropping {}: already included", tx.get_signature());
            }
            continue;
        }
        if !is_valid(storage, tx, at_height).await? {
            if log::log_enabled!(log::Level::Debug) {
                debug!("dropping {}: invalid at height {}", tx.get_signature(), at_height);
            }
            continue;
        }
        valid.push(tx.clone());
    }

    Ok(valid)
}

async fn is_valid<S: Storage>(
    storage: &S,
    tx: &Arc<Transaction>,
    at_height: Height,
) -> Result<bool, LedgerError> {
    match tx.get_data() {
        TransactionType::Payment(payload) => {
            if !tx.verify_signature() || tx.validate_fields().is_err() {
                return Ok(false);
            }
            timestamp_is_correct(storage, payload).await
        }
        // The initial distribution only enters the empty chain
        TransactionType::Genesis(_) => {
            Ok(at_height == GENESIS_HEIGHT
                && tx.verify_signature()
                && tx.validate_fields().is_ok())
        }
    }
}

// Anti-replay within an account: after the activation epoch, a payment
// must be stamped strictly later than the sender's last recorded one
async fn timestamp_is_correct<S: Storage>(
    storage: &S,
    payload: &PaymentPayload,
) -> Result<bool, LedgerError> {
    if payload.timestamp < TIMESTAMP_CHECK_EPOCH {
        return Ok(true);
    }

    let sender = Address::from_public_key(&payload.sender);
    match storage.get_last_sender_transaction(&sender).await? {
        None => Ok(true),
        Some(last) => Ok(last.get_timestamp() < payload.timestamp),
    }
}

// Pass B: per-sender timestamp monotonicity inside the batch. Payments
// are visited in timestamp order and each sender tracks the highest
// timestamp granted so far, seeded from the chain.
async fn pass_batch_timestamps<S: Storage>(
    storage: &S,
    txs: &[Arc<Transaction>],
) -> Result<Vec<Arc<Transaction>>, LedgerError> {
    let mut payments: Vec<&Arc<Transaction>> = txs.iter().filter(|tx| tx.is_payment()).collect();
    payments.sort_by(|a, b| {
        a.get_timestamp()
            .cmp(&b.get_timestamp())
            .then_with(|| a.get_signature().cmp(b.get_signature()))
    });

    let mut tracker: HashMap<Address, Option<TimestampMillis>> = HashMap::new();
    let mut rejected: HashSet<Signature> = HashSet::new();

    for tx in payments {
        let Some(sender) = tx.get_sender_address() else {
            continue;
        };

        if !tracker.contains_key(&sender) {
            let seed = storage
                .get_last_sender_transaction(&sender)
                .await?
                .map(|last| last.get_timestamp());
            tracker.insert(sender.clone(), seed);
        }

        if let Some(tracked) = tracker.get_mut(&sender) {
            match tracked {
                Some(latest) if tx.get_timestamp() <= *latest => {
                    if log::log_enabled!(log::Level::Debug) {
                        debug!(
                            "dropping {}: timestamp {} replays within batch",
                            tx.get_signature(),
                            tx.get_timestamp()
                        );
                    }
                    rejected.insert(tx.get_signature().clone());
                }
                _ => {
                    *tracked = Some(tx.get_timestamp());
                }
            }
        }
    }

    Ok(txs
        .iter()
        .filter(|tx| !rejected.contains(tx.get_signature()))
        .cloned()
        .collect())
}

// Pass C: fold the surviving deltas per account; every overdrafting
// sender gives its payments back largest amount first until solvent
// again. Dropping the largest first minimizes the number removed.
async fn pass_overdraft<S: Storage>(
    storage: &S,
    txs: &[Arc<Transaction>],
    at_height: Height,
) -> Result<Vec<Arc<Transaction>>, LedgerError> {
    let mut deltas: IndexMap<Address, i128> = IndexMap::new();
    for tx in txs {
        for (address, delta) in tx.get_balance_changes() {
            *deltas.entry(address).or_insert(0) += delta;
        }
    }

    let mut removed: HashSet<Signature> = HashSet::new();
    for (address, delta) in &deltas {
        if *delta >= 0 {
            continue;
        }

        let balance = storage.get_balance_at(address, at_height).await? as i128;
        let mut resulting = balance + delta;
        if resulting >= 0 {
            continue;
        }
        if log::log_enabled!(log::Level::Debug) {
            debug!("account {} would end up at {}", address, resulting);
        }

        let mut own: Vec<&Arc<Transaction>> = txs
            .iter()
            .filter(|tx| tx.is_payment() && tx.get_sender_address().as_ref() == Some(address))
            .collect();
        own.sort_by(|a, b| {
            b.get_amount()
                .cmp(&a.get_amount())
                .then_with(|| a.get_timestamp().cmp(&b.get_timestamp()))
                .then_with(|| a.get_signature().cmp(b.get_signature()))
        });

        for tx in own {
            if resulting >= 0 {
                break;
            }
            if removed.insert(tx.get_signature().clone()) {
                trace!("removing overdrafting transaction {}", tx.get_signature());
                resulting += tx.get_amount() as i128 + tx.get_fee() as i128;
            }
        }
    }

    Ok(txs
        .iter()
        .filter(|tx| !removed.contains(tx.get_signature()))
        .cloned()
        .collect())
}
