//! Re-entrant async lock keyed by tokio task identity.
//!
//! The owning task may acquire the lock again without deadlocking; every
//! acquisition must be matched by a release from the same task. Other tasks
//! queue on the inner tokio mutex, which wakes waiters in FIFO order.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task,
};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("re-entrant lock released by a task that does not own it")]
    NotOwner,
}

/// Identity of the code holding the lock. Code running outside any spawned
/// task (a runtime's `block_on` root) shares a single identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Holder {
    Task(task::Id),
    Root,
}

fn current_holder() -> Holder {
    task::try_id().map(Holder::Task).unwrap_or(Holder::Root)
}

struct Ownership {
    holder: Holder,
    depth: usize,
    _gate: OwnedMutexGuard<()>,
}

/// Lock that the holding task may acquire again.
///
/// Identity is per tokio task, not per future: `join!`/`select!` branches
/// polled by the same task share ownership and do not exclude each other.
/// The same holds for everything running at the runtime root. Code that needs
/// mutual exclusion between concurrent branches must run them as separate
/// spawned tasks.
pub struct ReentrantLock {
    gate: Arc<Mutex<()>>,
    owner: StdMutex<Option<Ownership>>,
}

impl Default for ReentrantLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ReentrantLock {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
            owner: StdMutex::new(None),
        }
    }

    /// Acquire and return a guard that releases on drop.
    pub async fn acquire(&self) -> ReentrantGuard<'_> {
        self.acquire_unguarded().await;
        ReentrantGuard { lock: self }
    }

    /// Acquire without a guard; pair with [`ReentrantLock::release`].
    pub async fn acquire_unguarded(&self) {
        let me = current_holder();
        {
            let mut owner = self.owner();
            if let Some(ownership) = owner.as_mut() {
                if ownership.holder == me {
                    ownership.depth += 1;
                    return;
                }
            }
        }

        let gate = Arc::clone(&self.gate).lock_owned().await;
        *self.owner() = Some(Ownership {
            holder: me,
            depth: 1,
            _gate: gate,
        });
    }

    pub fn release(&self) -> Result<(), LockError> {
        let me = current_holder();
        let mut owner = self.owner();
        match owner.as_mut() {
            Some(ownership) if ownership.holder == me => {
                ownership.depth -= 1;
                if ownership.depth == 0 {
                    // Dropping the ownership releases the gate and wakes one waiter.
                    *owner = None;
                }
                Ok(())
            }
            _ => Err(LockError::NotOwner),
        }
    }

    /// Re-entry depth if the calling task holds the lock, otherwise 0.
    pub fn depth(&self) -> usize {
        let me = current_holder();
        self.owner()
            .as_ref()
            .filter(|ownership| ownership.holder == me)
            .map(|ownership| ownership.depth)
            .unwrap_or(0)
    }

    pub fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    fn owner(&self) -> MutexGuard<'_, Option<Ownership>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped acquisition: releases on every exit path, including `?`, panics
/// and cancellation of the enclosing future.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReentrantGuard<'a> {
    lock: &'a ReentrantLock,
}

impl Drop for ReentrantGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release() {
            if std::thread::panicking() {
                error!("lock guard dropped during unwind: {err}");
            } else {
                panic!("{err}: guard dropped outside its owning task");
            }
        }
    }
}
