use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;
use shared::{identity::VoterIdentity, models::*};

use crate::store::{PollStore, StoreError};

const CHANGE_BUFFER: usize = 64;

#[derive(Debug, Default)]
struct Tables {
    polls: Vec<Poll>,
    votes: Vec<Vote>,
}

/// Process-local store with the same semantics as the Postgres schema,
/// including the one-vote-per-voter constraint. Clones share the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    changes: broadcast::Sender<Uuid>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            changes,
        }
    }

    pub fn changes(&self) -> broadcast::Receiver<Uuid> {
        self.changes.subscribe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::LockFailed)
    }

    fn notify(&self, poll_id: Uuid) {
        // no subscribers is fine
        let _ = self.changes.send(poll_id);
    }

    fn newest_first(mut polls: Vec<Poll>) -> Vec<Poll> {
        polls.reverse();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        polls
    }
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&mut self, owner: Uuid, poll: &NewPoll) -> Result<Poll, StoreError> {
        let now = OffsetDateTime::now_utc();
        let poll = Poll {
            id: Uuid::new_v4(),
            title: poll.title.clone(),
            description: poll.description.clone(),
            options: poll.options.clone(),
            user_id: owner,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.polls.push(poll.clone());
        Ok(poll)
    }

    async fn get_poll(&mut self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        Ok(self.lock()?.polls.iter().find(|p| p.id == id).cloned())
    }

    async fn poll_status(&mut self, id: Uuid) -> Result<Option<PollStatus>, StoreError> {
        Ok(self.lock()?.polls.iter().find(|p| p.id == id).map(|p| PollStatus {
            id: p.id,
            is_active: p.is_active,
            option_count: p.options.len() as i32,
        }))
    }

    async fn list_active_polls(&mut self) -> Result<Vec<Poll>, StoreError> {
        let polls = self.lock()?.polls.iter().filter(|p| p.is_active).cloned().collect();
        Ok(Self::newest_first(polls))
    }

    async fn list_owner_polls(&mut self, owner: Uuid) -> Result<Vec<Poll>, StoreError> {
        let polls = self.lock()?.polls.iter().filter(|p| p.user_id == owner).cloned().collect();
        Ok(Self::newest_first(polls))
    }

    async fn update_poll(&mut self, id: Uuid, update: &PollUpdate) -> Result<Option<Poll>, StoreError> {
        let updated = {
            let mut tables = self.lock()?;
            let Some(poll) = tables.polls.iter_mut().find(|p| p.id == id) else {
                return Ok(None);
            };
            if let Some(title) = &update.title {
                poll.title = title.clone();
            }
            if let Some(description) = &update.description {
                poll.description = description.clone();
            }
            poll.updated_at = OffsetDateTime::now_utc();
            poll.clone()
        };
        self.notify(id);
        Ok(Some(updated))
    }

    async fn set_poll_active(&mut self, id: Uuid, active: bool) -> Result<Option<Poll>, StoreError> {
        let updated = {
            let mut tables = self.lock()?;
            let Some(poll) = tables.polls.iter_mut().find(|p| p.id == id) else {
                return Ok(None);
            };
            poll.is_active = active;
            poll.updated_at = OffsetDateTime::now_utc();
            poll.clone()
        };
        self.notify(id);
        Ok(Some(updated))
    }

    async fn delete_poll(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let deleted = {
            let mut tables = self.lock()?;
            let before = tables.polls.len();
            tables.polls.retain(|p| p.id != id);
            tables.votes.retain(|v| v.poll_id != id);
            tables.polls.len() < before
        };
        if deleted {
            self.notify(id);
        }
        Ok(deleted)
    }

    async fn find_vote(&mut self, poll_id: Uuid, voter: &VoterIdentity) -> Result<Option<Vote>, StoreError> {
        Ok(self
            .lock()?
            .votes
            .iter()
            .find(|v| v.poll_id == poll_id && v.identity().as_ref() == Some(voter))
            .cloned())
    }

    async fn insert_vote(
        &mut self,
        poll_id: Uuid,
        option_index: i32,
        voter: &VoterIdentity,
    ) -> Result<Vote, StoreError> {
        let vote = {
            let mut tables = self.lock()?;
            if !tables.polls.iter().any(|p| p.id == poll_id) {
                return Err(StoreError::NotFound);
            }
            // checked and inserted under one lock, like the unique index
            if tables
                .votes
                .iter()
                .any(|v| v.poll_id == poll_id && v.identity().as_ref() == Some(voter))
            {
                return Err(StoreError::Conflict);
            }
            let vote = Vote {
                id: Uuid::new_v4(),
                poll_id,
                option_index,
                voter_id: voter.user_id(),
                voter_ip: voter.ip().map(str::to_string),
                created_at: OffsetDateTime::now_utc(),
            };
            tables.votes.push(vote.clone());
            vote
        };
        self.notify(poll_id);
        Ok(vote)
    }

    async fn poll_results(&mut self, id: Uuid) -> Result<PollWithResults, StoreError> {
        let tables = self.lock()?;
        let poll = tables
            .polls
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        let votes = tables.votes.iter().filter(|v| v.poll_id == id);
        Ok(PollWithResults::from_votes(poll, votes))
    }
}
