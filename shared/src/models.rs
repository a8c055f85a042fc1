use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::identity::VoterIdentity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub user_id: Uuid,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The slice of a poll the vote path needs before inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct PollStatus {
    pub id: Uuid,
    pub is_active: bool,
    pub option_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_index: i32,
    pub voter_id: Option<Uuid>,
    pub voter_ip: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Vote {
    pub fn identity(&self) -> Option<VoterIdentity> {
        match (self.voter_id, &self.voter_ip) {
            (Some(id), None) => Some(VoterIdentity::User(id)),
            (None, Some(ip)) => Some(VoterIdentity::Ip(ip.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollWithResults {
    #[serde(flatten)]
    pub poll: Poll,
    pub vote_counts: BTreeMap<String, i64>,
    pub total_votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionResult {
    pub index: usize,
    pub label: String,
    pub votes: i64,
    pub percentage: u32,
}

/// A poll that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
}

/// Validated changes to an existing poll. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl PollUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePollRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePollRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CastVoteRequest {
    #[serde(default)]
    pub option_index: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub poll: Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollsResponse {
    pub polls: Vec<Poll>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub vote: Vote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HasVotedResponse {
    pub has_voted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResultsResponse {
    #[serde(flatten)]
    pub poll: PollWithResults,
    pub results: Vec<OptionResult>,
}

impl From<PollWithResults> for PollResultsResponse {
    fn from(poll: PollWithResults) -> Self {
        let results = poll.option_results();
        Self { poll, results }
    }
}
