//! Optimistic mutation engine.
//!
//! A mutation applies its speculative value locally before any suspension,
//! awaits the remote call, then either keeps the value (commit) or puts the
//! prior value back (rollback).
//!
//! Every mutation is tagged with a sequence number drawn from one monotonic
//! counter. The latest sequence issued per key is the only one whose
//! resolution is applied; an older resolution arriving late is not, so a
//! toggle issued while another is in flight supersedes it.
//!
//! The rollback target of a key is the last value the store confirmed. It is
//! taken when the first mutation of a chain starts and moves forward only
//! when a mutation of that chain commits, superseded or not.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

use tracing::{debug, warn};

use murmur_core::{Error, Result};

use crate::lock;
use crate::notice::Notices;

/// Resolution state of a [`PendingMutation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The remote call has not returned yet.
    Pending,
    /// The remote call succeeded; the speculative value stands.
    Committed,
    /// The remote call failed; the prior value was restored.
    RolledBack,
    /// A newer mutation on the same key was issued; this one was ignored.
    Superseded,
}

/// An in-flight optimistic change.
#[derive(Debug, Clone)]
pub struct PendingMutation<K, V> {
    pub key: K,
    pub seq: u64,
    pub prior: V,
    pub speculative: V,
    pub resolution: Resolution,
}

/// What became of a mutation.
#[derive(Debug)]
pub enum MutationOutcome<T> {
    Committed(T),
    RolledBack(Error),
    Superseded,
}

impl<T> MutationOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, MutationOutcome::RolledBack(_))
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, MutationOutcome::Superseded)
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            MutationOutcome::Committed(_) => Resolution::Committed,
            MutationOutcome::RolledBack(_) => Resolution::RolledBack,
            MutationOutcome::Superseded => Resolution::Superseded,
        }
    }
}

/// Per-key bookkeeping for the mutations in flight.
struct Slot {
    /// Latest sequence issued.
    seq: u64,
    /// Sequence of the mutation that produced `settled`, 0 for the chain start.
    settled_seq: u64,
    settled: Box<dyn Any + Send>,
}

impl Slot {
    fn settled<V: Clone + 'static>(&self) -> Option<V> {
        self.settled.downcast_ref::<V>().cloned()
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("seq", &self.seq)
            .field("settled_seq", &self.settled_seq)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Sequences<K> {
    next: u64,
    latest: HashMap<K, Slot>,
}

/// Applies optimistic mutations and reconciles them per key.
///
/// `K` identifies what a mutation guards, e.g. `(item, field)` or
/// `(actor, target)`.
#[derive(Debug)]
pub struct OptimisticEngine<K> {
    sequences: Mutex<Sequences<K>>,
    notices: Notices,
}

impl<K> OptimisticEngine<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(notices: Notices) -> Self {
        Self {
            sequences: Mutex::new(Sequences {
                next: 0,
                latest: HashMap::new(),
            }),
            notices,
        }
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Returns true while a mutation for `key` awaits its remote call.
    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.sequences).latest.contains_key(key)
    }

    /// Run one optimistic mutation.
    ///
    /// `prepare` returns `(current, speculative)` from local state. It and
    /// every call of `apply` run while the engine's sequence table is locked,
    /// so reading the current value, issuing the sequence number and applying
    /// the speculative value happen as one step; neither closure may call
    /// back into the engine.
    ///
    /// `apply` is called with the speculative value and
    /// [`Resolution::Pending`] before anything is awaited, then once more on
    /// resolution: with the speculative value on commit, or the last confirmed
    /// value on rollback. When another mutation on the key is already in
    /// flight, the last confirmed value is that chain's, not `current`. A
    /// superseded mutation never calls `apply` again, but its commit becomes
    /// the rollback target of the mutations after it.
    ///
    /// On rollback, `label` prefixes the error notice, e.g. "Could not like post".
    pub async fn mutate<V, T, P, A, R, Fut>(
        &self,
        key: K,
        label: &str,
        prepare: P,
        apply: A,
        remote: R,
    ) -> MutationOutcome<T>
    where
        V: Clone + Send + 'static,
        P: FnOnce() -> (V, V),
        A: Fn(&V, Resolution),
        R: FnOnce(&V) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut pending = {
            let mut sequences = lock(&self.sequences);
            sequences.next += 1;
            let seq = sequences.next;

            let (current, speculative) = prepare();
            let slot = sequences.latest.entry(key.clone()).or_insert_with(|| Slot {
                seq,
                settled_seq: 0,
                settled: Box::new(current.clone()),
            });
            slot.seq = seq;
            let prior = match slot.settled::<V>() {
                Some(settled) => settled,
                None => {
                    slot.settled = Box::new(current.clone());
                    slot.settled_seq = 0;
                    current
                }
            };
            apply(&speculative, Resolution::Pending);

            PendingMutation {
                key,
                seq,
                prior,
                speculative,
                resolution: Resolution::Pending,
            }
        };

        let result = remote(&pending.speculative).await;

        let mut sequences = lock(&self.sequences);
        let slot = match sequences.latest.get_mut(&pending.key) {
            Some(slot) if slot.seq == pending.seq => slot,
            Some(slot) => {
                if result.is_ok() && pending.seq > slot.settled_seq {
                    slot.settled = Box::new(pending.speculative.clone());
                    slot.settled_seq = pending.seq;
                }
                pending.resolution = Resolution::Superseded;
                debug!(key = ?pending.key, seq = pending.seq, "Ignoring superseded mutation");
                return MutationOutcome::Superseded;
            }
            None => {
                pending.resolution = Resolution::Superseded;
                debug!(key = ?pending.key, seq = pending.seq, "Ignoring superseded mutation");
                return MutationOutcome::Superseded;
            }
        };
        if let Some(settled) = slot.settled::<V>() {
            pending.prior = settled;
        }
        sequences.latest.remove(&pending.key);

        match result {
            Ok(value) => {
                pending.resolution = Resolution::Committed;
                apply(&pending.speculative, Resolution::Committed);
                debug!(key = ?pending.key, seq = pending.seq, "Mutation committed");
                MutationOutcome::Committed(value)
            }
            Err(error) => {
                pending.resolution = Resolution::RolledBack;
                apply(&pending.prior, Resolution::RolledBack);
                drop(sequences);
                warn!(key = ?pending.key, seq = pending.seq, %error, "Mutation rolled back");
                self.notices.error(format!("{}: {}", label, error));
                MutationOutcome::RolledBack(error)
            }
        }
    }

    /// [`mutate`](Self::mutate) for callers that already hold the values.
    pub async fn mutate_value<V, T, A, Fut>(
        &self,
        key: K,
        label: &str,
        current: V,
        speculative: V,
        apply: A,
        remote: Fut,
    ) -> MutationOutcome<T>
    where
        V: Clone + Send + 'static,
        A: Fn(&V, Resolution),
        Fut: Future<Output = Result<T>>,
    {
        self.mutate(key, label, || (current, speculative), apply, |_| remote)
            .await
    }
}

/// Signed counter step for a boolean transition: +1 on, -1 off, 0 unchanged.
pub fn toggle_delta(from: bool, to: bool) -> i64 {
    match (from, to) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}
