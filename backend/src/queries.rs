use std::collections::BTreeMap;
use sqlx::{pool::PoolConnection, types::Json, Postgres};
use uuid::Uuid;
use shared::{identity::VoterIdentity, models::*};

use crate::store::{PollStore, StoreError};

const POLL_COLUMNS: &str =
    "id, title, description, options, user_id, is_active, created_at, updated_at";

const VOTE_COLUMNS: &str = "id, poll_id, option_index, voter_id, voter_ip, created_at";

/// A pooled Postgres connection checked out for the length of one request.
pub struct PgStore {
    conn: PoolConnection<Postgres>,
}

impl PgStore {
    pub fn new(conn: PoolConnection<Postgres>) -> Self {
        Self { conn }
    }
}

#[derive(sqlx::FromRow)]
struct PollResultsRow {
    #[sqlx(flatten)]
    poll: Poll,
    vote_counts: Json<BTreeMap<String, i64>>,
    total_votes: i64,
}

fn vote_insert_error(e: sqlx::Error) -> StoreError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict,
        // poll deleted between the status check and the insert
        Some(db) if db.is_foreign_key_violation() => StoreError::NotFound,
        _ => StoreError::Database(e),
    }
}

#[rocket::async_trait]
impl PollStore for PgStore {
    async fn insert_poll(&mut self, owner: Uuid, poll: &NewPoll) -> Result<Poll, StoreError> {
        let query = format!(
            "INSERT INTO polls (title, description, options, user_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {POLL_COLUMNS}"
        );
        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(&poll.title)
            .bind(&poll.description)
            .bind(&poll.options)
            .bind(owner)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(poll)
    }

    async fn get_poll(&mut self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        let query = format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1");
        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(poll)
    }

    async fn poll_status(&mut self, id: Uuid) -> Result<Option<PollStatus>, StoreError> {
        let status = sqlx::query_as::<_, PollStatus>(
            "SELECT id, is_active, cardinality(options) AS option_count
             FROM polls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(status)
    }

    async fn list_active_polls(&mut self) -> Result<Vec<Poll>, StoreError> {
        let query = format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE is_active = TRUE ORDER BY created_at DESC"
        );
        let polls = sqlx::query_as::<_, Poll>(&query)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(polls)
    }

    async fn list_owner_polls(&mut self, owner: Uuid) -> Result<Vec<Poll>, StoreError> {
        let query = format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let polls = sqlx::query_as::<_, Poll>(&query)
            .bind(owner)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(polls)
    }

    async fn update_poll(&mut self, id: Uuid, update: &PollUpdate) -> Result<Option<Poll>, StoreError> {
        let query = format!(
            "UPDATE polls SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {POLL_COLUMNS}"
        );
        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(id)
            .bind(&update.title)
            .bind(update.description.is_some())
            .bind(update.description.clone().flatten())
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(poll)
    }

    async fn set_poll_active(&mut self, id: Uuid, active: bool) -> Result<Option<Poll>, StoreError> {
        let query = format!(
            "UPDATE polls SET is_active = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {POLL_COLUMNS}"
        );
        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(id)
            .bind(active)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(poll)
    }

    async fn delete_poll(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_vote(&mut self, poll_id: Uuid, voter: &VoterIdentity) -> Result<Option<Vote>, StoreError> {
        let query = match voter {
            VoterIdentity::User(_) => format!("SELECT {VOTE_COLUMNS} FROM votes WHERE poll_id = $1 AND voter_id = $2"),
            VoterIdentity::Ip(_) => format!("SELECT {VOTE_COLUMNS} FROM votes WHERE poll_id = $1 AND voter_ip = $2"),
        };
        let query = sqlx::query_as::<_, Vote>(&query).bind(poll_id);
        let query = match voter {
            VoterIdentity::User(id) => query.bind(*id),
            VoterIdentity::Ip(ip) => query.bind(ip.as_str()),
        };
        let vote = query.fetch_optional(&mut *self.conn).await?;
        Ok(vote)
    }

    async fn insert_vote(
        &mut self,
        poll_id: Uuid,
        option_index: i32,
        voter: &VoterIdentity,
    ) -> Result<Vote, StoreError> {
        let query = format!(
            "INSERT INTO votes (poll_id, option_index, voter_id, voter_ip)
             VALUES ($1, $2, $3, $4)
             RETURNING {VOTE_COLUMNS}"
        );
        sqlx::query_as::<_, Vote>(&query)
            .bind(poll_id)
            .bind(option_index)
            .bind(voter.user_id())
            .bind(voter.ip())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(vote_insert_error)
    }

    async fn poll_results(&mut self, id: Uuid) -> Result<PollWithResults, StoreError> {
        let query = format!(
            "SELECT {POLL_COLUMNS}, vote_counts, total_votes FROM poll_results WHERE id = $1"
        );
        let row = sqlx::query_as::<_, PollResultsRow>(&query)
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => StoreError::NotFound,
                e => StoreError::Database(e),
            })?;

        Ok(PollWithResults {
            poll: row.poll,
            vote_counts: row.vote_counts.0,
            total_votes: row.total_votes,
        })
    }
}
