use sqlx::postgres::{PgListener, PgPool};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;
use shared::{identity::VoterIdentity, models::*};

use crate::{memory::MemoryStore, queries::PgStore};

pub const POLL_CHANGES_CHANNEL: &str = "poll_changes";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no matching row")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error("store lock poisoned")]
    LockFailed,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Query interface over the `polls` and `votes` tables and the
/// `poll_results` view. One value is opened per request and dropped with it.
#[rocket::async_trait]
pub trait PollStore: Send {
    async fn insert_poll(&mut self, owner: Uuid, poll: &NewPoll) -> Result<Poll, StoreError>;

    async fn get_poll(&mut self, id: Uuid) -> Result<Option<Poll>, StoreError>;

    async fn poll_status(&mut self, id: Uuid) -> Result<Option<PollStatus>, StoreError>;

    /// Active polls, newest first.
    async fn list_active_polls(&mut self) -> Result<Vec<Poll>, StoreError>;

    /// Every poll owned by `owner`, newest first.
    async fn list_owner_polls(&mut self, owner: Uuid) -> Result<Vec<Poll>, StoreError>;

    async fn update_poll(&mut self, id: Uuid, update: &PollUpdate) -> Result<Option<Poll>, StoreError>;

    async fn set_poll_active(&mut self, id: Uuid, active: bool) -> Result<Option<Poll>, StoreError>;

    /// Removes the poll and its votes. Returns whether a row was deleted.
    async fn delete_poll(&mut self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_vote(&mut self, poll_id: Uuid, voter: &VoterIdentity) -> Result<Option<Vote>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when `voter` already voted on `poll_id`.
    async fn insert_vote(
        &mut self,
        poll_id: Uuid,
        option_index: i32,
        voter: &VoterIdentity,
    ) -> Result<Vote, StoreError>;

    /// Fails with [`StoreError::NotFound`] when the poll does not exist.
    async fn poll_results(&mut self, id: Uuid) -> Result<PollWithResults, StoreError>;
}

/// Where polls live. Hands out per-request store handles and change
/// subscriptions.
#[derive(Clone)]
pub enum Backend {
    Postgres(PgPool),
    Memory(MemoryStore),
}

impl Backend {
    pub async fn open(&self) -> Result<Box<dyn PollStore>, StoreError> {
        match self {
            Backend::Postgres(pool) => {
                let conn = pool.acquire().await?;
                Ok(Box::new(PgStore::new(conn)))
            }
            Backend::Memory(store) => Ok(Box::new(store.clone())),
        }
    }

    pub async fn subscribe(&self, poll_id: Uuid) -> Result<Subscription, StoreError> {
        let source = match self {
            Backend::Postgres(pool) => {
                let mut listener = PgListener::connect_with(pool).await?;
                listener.listen(POLL_CHANGES_CHANNEL).await?;
                Source::Postgres(listener)
            }
            Backend::Memory(store) => Source::Memory(store.changes()),
        };
        debug!(%poll_id, "Opened results subscription");
        Ok(Subscription { poll_id, source })
    }
}

enum Source {
    Postgres(PgListener),
    Memory(broadcast::Receiver<Uuid>),
}

/// Change feed for a single poll. Call [`Subscription::unsubscribe`] when the
/// consumer goes away; dropping it also releases the listener.
pub struct Subscription {
    poll_id: Uuid,
    source: Source,
}

impl Subscription {
    pub fn poll_id(&self) -> Uuid {
        self.poll_id
    }

    /// Waits for the next change to this poll. `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<()> {
        loop {
            let changed = match &mut self.source {
                Source::Postgres(listener) => match listener.recv().await {
                    Ok(notification) => notification.payload().parse::<Uuid>().ok(),
                    Err(e) => {
                        warn!("Results listener failed: {}", e);
                        return None;
                    }
                },
                Source::Memory(rx) => match rx.recv().await {
                    Ok(id) => Some(id),
                    // missed some changes; one refresh covers them all
                    Err(broadcast::error::RecvError::Lagged(_)) => Some(self.poll_id),
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            };

            if changed == Some(self.poll_id) {
                return Some(());
            }
        }
    }

    pub async fn unsubscribe(self) {
        if let Source::Postgres(mut listener) = self.source {
            if let Err(e) = listener.unlisten_all().await {
                warn!("Failed to unlisten: {}", e);
            }
        }
        debug!(poll_id = %self.poll_id, "Closed results subscription");
    }
}
