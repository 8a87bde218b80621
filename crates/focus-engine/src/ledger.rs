//! Fire-and-forget ledger writer. Mutations enqueue their action record on a
//! bounded channel drained by a detached task; a full queue or a failed
//! insert is logged and counted, never surfaced to the mutating caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use focus_core::action::ActionInput;
use focus_store::actions::ActionRepo;

const DEFAULT_QUEUE_CAPACITY: usize = 256;

enum LedgerMsg {
    Record(ActionInput),
    Flush(oneshot::Sender<()>),
}

/// Counters kept by the drain task so dropped or failed writes stay
/// observable even though they never block a mutation.
#[derive(Debug, Default)]
pub struct LedgerStats {
    recorded: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl LedgerStats {
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct ActionLogger {
    tx: mpsc::Sender<LedgerMsg>,
    stats: Arc<LedgerStats>,
}

impl ActionLogger {
    /// Start the drain task and return a handle for enqueueing records.
    pub fn spawn(repo: ActionRepo) -> Self {
        Self::spawn_with_capacity(repo, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(repo: ActionRepo, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let stats = Arc::new(LedgerStats::default());
        tokio::spawn(drain(rx, repo, Arc::clone(&stats)));
        Self { tx, stats }
    }

    /// Enqueue a record. Never blocks and never errors outward.
    pub fn record(&self, input: ActionInput) {
        match self.tx.try_send(LedgerMsg::Record(input)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("action ledger queue full, dropping entry");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("action ledger drain task gone, dropping entry");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Wait until every previously enqueued record has been drained. Used at
    /// shutdown and by tests; callers of `record` must not assume a write is
    /// queryable before a flush.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(LedgerMsg::Flush(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }

    pub fn stats(&self) -> &LedgerStats {
        &self.stats
    }
}

async fn drain(mut rx: mpsc::Receiver<LedgerMsg>, repo: ActionRepo, stats: Arc<LedgerStats>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            LedgerMsg::Record(input) => match repo.insert(&input) {
                Ok(_) => {
                    stats.recorded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(error = %e, entity_id = %input.entity_id, "action ledger write failed");
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                }
            },
            LedgerMsg::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::action::{ActionKind, EntityType};
    use focus_core::actor::ActorKind;
    use focus_core::ids::UserId;
    use focus_store::actions::ActionQuery;
    use focus_store::Database;

    fn input() -> ActionInput {
        ActionInput {
            entity_id: "task_1".into(),
            entity_type: EntityType::Task,
            actor_id: UserId::from_raw("user_1"),
            actor_kind: ActorKind::Agent,
            action_kind: ActionKind::Create,
            changes: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn record_lands_after_flush() {
        let db = Database::in_memory().unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));

        logger.record(input());
        logger.flush().await;

        let records = ActionRepo::new(db)
            .query(&ActionQuery::for_viewer(UserId::from_raw("user_2")))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(logger.stats().recorded(), 1);
    }

    #[tokio::test]
    async fn insert_failure_is_counted_not_raised() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("DROP TABLE actions", [])?;
            Ok(())
        })
        .unwrap();

        let logger = ActionLogger::spawn(ActionRepo::new(db));
        logger.record(input());
        logger.flush().await;

        assert_eq!(logger.stats().failed(), 1);
        assert_eq!(logger.stats().recorded(), 0);
    }

    #[tokio::test]
    async fn flush_on_idle_logger_returns() {
        let db = Database::in_memory().unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db));
        logger.flush().await;
    }
}
