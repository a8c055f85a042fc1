use tracing::{debug, info};
use uuid::Uuid;
use shared::{identity::VoterIdentity, models::*, validation::*};

use crate::{error::ApiError, store::PollStore};

pub struct PollProcessor;

impl PollProcessor {
    pub async fn create_poll(
        store: &mut dyn PollStore,
        owner: Uuid,
        request: &CreatePollRequest,
    ) -> Result<Poll, ApiError> {
        let new_poll = validate_poll_request(request)?;
        let poll = store.insert_poll(owner, &new_poll).await?;
        info!(poll_id = %poll.id, %owner, options = poll.options.len(), "Created poll");
        Ok(poll)
    }

    /// Without an owner filter only active polls are listed. With one, the
    /// caller has to be that owner.
    pub async fn list_polls(
        store: &mut dyn PollStore,
        caller: Option<Uuid>,
        owner_filter: Option<&str>,
    ) -> Result<Vec<Poll>, ApiError> {
        let Some(requested) = owner_filter.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(store.list_active_polls().await?);
        };

        let owner = match (caller, Uuid::parse_str(requested)) {
            (Some(caller), Ok(requested)) if caller == requested => caller,
            _ => {
                debug!("Refused listing polls of {} for {:?}", requested, caller);
                return Err(ApiError::Unauthorized);
            }
        };
        Ok(store.list_owner_polls(owner).await?)
    }

    pub async fn poll_results(store: &mut dyn PollStore, id: Uuid) -> Result<PollWithResults, ApiError> {
        Ok(store.poll_results(id).await?)
    }

    /// Records one vote. Checks run in order: poll exists, poll is active,
    /// option index is present and in range. Duplicates are caught by the
    /// store's uniqueness constraint on (poll, voter), not by a lookup beforehand.
    pub async fn submit_vote(
        store: &mut dyn PollStore,
        poll_id: Uuid,
        option_index: Option<i32>,
        voter: &VoterIdentity,
    ) -> Result<Vote, ApiError> {
        let status = store.poll_status(poll_id).await?.ok_or(ApiError::NotFound)?;
        if !status.is_active {
            return Err(ApiError::PollInactive);
        }
        let option_index = validate_option_index(option_index, status.option_count)?;

        let vote = store.insert_vote(poll_id, option_index, voter).await?;
        info!(%poll_id, vote_id = %vote.id, option_index, "Recorded vote");
        Ok(vote)
    }

    pub async fn has_voted(
        store: &mut dyn PollStore,
        poll_id: Uuid,
        voter: &VoterIdentity,
    ) -> Result<bool, ApiError> {
        store.poll_status(poll_id).await?.ok_or(ApiError::NotFound)?;
        Ok(store.find_vote(poll_id, voter).await?.is_some())
    }

    async fn owned_poll(store: &mut dyn PollStore, id: Uuid, caller: Uuid) -> Result<Poll, ApiError> {
        let poll = store.get_poll(id).await?.ok_or(ApiError::NotFound)?;
        if poll.user_id != caller {
            debug!(poll_id = %id, %caller, "Caller does not own poll");
            return Err(ApiError::Unauthorized);
        }
        Ok(poll)
    }

    pub async fn update_poll(
        store: &mut dyn PollStore,
        id: Uuid,
        caller: Uuid,
        request: &UpdatePollRequest,
    ) -> Result<Poll, ApiError> {
        let update = validate_poll_update(request)?;
        Self::owned_poll(store, id, caller).await?;
        store.update_poll(id, &update).await?.ok_or(ApiError::NotFound)
    }

    pub async fn toggle_poll(store: &mut dyn PollStore, id: Uuid, caller: Uuid) -> Result<Poll, ApiError> {
        let poll = Self::owned_poll(store, id, caller).await?;
        let poll = store
            .set_poll_active(id, !poll.is_active)
            .await?
            .ok_or(ApiError::NotFound)?;
        info!(poll_id = %id, is_active = poll.is_active, "Toggled poll");
        Ok(poll)
    }

    pub async fn delete_poll(store: &mut dyn PollStore, id: Uuid, caller: Uuid) -> Result<(), ApiError> {
        Self::owned_poll(store, id, caller).await?;
        if !store.delete_poll(id).await? {
            return Err(ApiError::NotFound);
        }
        info!(poll_id = %id, "Deleted poll");
        Ok(())
    }
}
