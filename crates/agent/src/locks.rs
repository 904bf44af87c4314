//! Per-user turn queue — one exchange at a time per user id, in arrival order.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Hands out ordered turns per user id.
///
/// [`reserve`](Self::reserve) is synchronous, so a caller that reserves in
/// receive order gets served in receive order no matter how the tasks are
/// scheduled afterwards. Each turn waits for the previous turn of the same
/// user to be dropped; other users are never blocked.
#[derive(Debug, Default)]
pub struct UserLocks {
    tails: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

/// A place in one user's queue. Dropping it lets the next turn run.
#[derive(Debug)]
pub struct UserTurn {
    previous: Option<oneshot::Receiver<()>>,
    _release: oneshot::Sender<()>,
}

impl UserTurn {
    /// Wait until every earlier turn for this user has been dropped.
    pub async fn wait(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Nothing is ever sent: the sender being dropped is the signal.
            let _ = previous.await;
        }
    }
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next place in `user_id`'s queue without waiting.
    pub fn reserve(&self, user_id: &str) -> UserTurn {
        let (release, done) = oneshot::channel();
        let mut tails = self.tails.lock().unwrap_or_else(PoisonError::into_inner);
        tails.retain(|_, tail| !matches!(tail.try_recv(), Err(TryRecvError::Closed)));
        let previous = tails.insert(user_id.to_string(), done);
        UserTurn {
            previous,
            _release: release,
        }
    }

    /// Reserve a turn and wait for it.
    pub async fn acquire(&self, user_id: &str) -> UserTurn {
        let mut turn = self.reserve(user_id);
        turn.wait().await;
        turn
    }

    /// Number of users with a queued or running turn (as of the last reserve).
    pub fn len(&self) -> usize {
        self.tails.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_waits() {
        let locks = Arc::new(UserLocks::new());
        let turn = locks.acquire("alice").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _turn = locks.acquire("alice").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(turn);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _alice = locks.acquire("alice").await;
        let bob = tokio::time::timeout(Duration::from_millis(50), locks.acquire("bob")).await;
        assert!(bob.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn turns_run_in_reservation_order() {
        let locks = UserLocks::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = locks.reserve("alice");
        let second = locks.reserve("alice");

        // Start the later turn first; it must still run second.
        let later = {
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let mut turn = second;
                turn.wait().await;
                order.lock().unwrap().push("second");
            })
        };
        let earlier = {
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let mut turn = first;
                turn.wait().await;
                tokio::time::sleep(Duration::from_millis(300)).await;
                order.lock().unwrap().push("first");
            })
        };

        earlier.await.unwrap();
        later.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = UserLocks::new();
        drop(locks.acquire("alice").await);
        drop(locks.acquire("bob").await);
        // Reserving for bob again prunes alice's finished entry.
        let _bob = locks.acquire("bob").await;
        assert_eq!(locks.len(), 1);
    }
}
