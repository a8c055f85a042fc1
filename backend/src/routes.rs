use std::ops::{Deref, DerefMut};
use rocket::{
    delete, get, patch, post,
    http::Status,
    request::{FromRequest, Outcome},
    response::stream::{Event, EventStream},
    serde::json::Json,
    tokio::select,
    FromForm, Request, Shutdown, State,
};
use tracing::{error, instrument};
use uuid::Uuid;
use shared::{identity::{ClientIp, VoterIdentity}, models::*};

use crate::{
    auth::{AuthUser, SessionVerifier},
    config::Config,
    error::ApiError,
    memory::MemoryStore,
    processor::PollProcessor,
    store::{Backend, PollStore},
    utils::parse_poll_id,
};

pub struct AppState {
    pub backend: Backend,
    pub sessions: SessionVerifier,
}

impl AppState {
    pub fn new(backend: Backend, config: &Config) -> Self {
        let sessions = match &config.jwt_secret {
            Some(secret) => SessionVerifier::new_with_secret(secret.clone()),
            None => SessionVerifier::new(),
        };
        Self { backend, sessions }
    }

    pub fn in_memory(config: &Config) -> Self {
        Self::new(Backend::Memory(MemoryStore::new()), config)
    }
}

/// Store handle checked out for one request and released when it ends.
pub struct Store(Box<dyn PollStore>);

impl Deref for Store {
    type Target = dyn PollStore;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl DerefMut for Store {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("application state not mounted".into()),
            ));
        };

        match state.backend.open().await {
            Ok(store) => Outcome::Success(Store(store)),
            Err(e) => {
                error!("Failed to open store: {}", e);
                Outcome::Error((Status::InternalServerError, ApiError::Internal(e.to_string())))
            }
        }
    }
}

#[derive(Debug, FromForm)]
pub struct ListQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip(store, request), fields(owner = %user.id))]
#[post("/polls", data = "<request>")]
pub async fn create_poll(
    user: AuthUser,
    mut store: Store,
    request: Json<CreatePollRequest>,
) -> Result<(Status, Json<PollResponse>), ApiError> {
    let poll = PollProcessor::create_poll(&mut *store, user.id, &request).await?;
    Ok((Status::Created, Json(PollResponse { poll })))
}

#[instrument(skip(store))]
#[get("/polls?<query..>")]
pub async fn list_polls(
    query: ListQuery,
    user: Option<AuthUser>,
    mut store: Store,
) -> Result<Json<PollsResponse>, ApiError> {
    let caller = user.map(|u| u.id);
    let polls = PollProcessor::list_polls(&mut *store, caller, query.user_id.as_deref()).await?;
    Ok(Json(PollsResponse { polls }))
}

#[instrument(skip(store))]
#[get("/polls/<id>")]
pub async fn get_poll(id: &str, mut store: Store) -> Result<Json<PollResultsResponse>, ApiError> {
    let poll_id = parse_poll_id(id)?;
    let results = PollProcessor::poll_results(&mut *store, poll_id).await?;
    Ok(Json(results.into()))
}

#[instrument(skip(store, request), fields(caller = %user.id))]
#[patch("/polls/<id>", data = "<request>")]
pub async fn update_poll(
    id: &str,
    user: AuthUser,
    mut store: Store,
    request: Json<UpdatePollRequest>,
) -> Result<Json<PollResponse>, ApiError> {
    let poll_id = parse_poll_id(id)?;
    let poll = PollProcessor::update_poll(&mut *store, poll_id, user.id, &request).await?;
    Ok(Json(PollResponse { poll }))
}

#[instrument(skip(store), fields(caller = %user.id))]
#[post("/polls/<id>/toggle")]
pub async fn toggle_poll(id: &str, user: AuthUser, mut store: Store) -> Result<Json<PollResponse>, ApiError> {
    let poll_id = parse_poll_id(id)?;
    let poll = PollProcessor::toggle_poll(&mut *store, poll_id, user.id).await?;
    Ok(Json(PollResponse { poll }))
}

#[instrument(skip(store), fields(caller = %user.id))]
#[delete("/polls/<id>")]
pub async fn delete_poll(id: &str, user: AuthUser, mut store: Store) -> Result<Json<DeleteResponse>, ApiError> {
    let poll_id = parse_poll_id(id)?;
    PollProcessor::delete_poll(&mut *store, poll_id, user.id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

#[instrument(skip(store, request))]
#[post("/polls/<id>/vote", data = "<request>")]
pub async fn cast_vote(
    id: &str,
    user: Option<AuthUser>,
    client: ClientIp,
    mut store: Store,
    request: Json<CastVoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let poll_id = parse_poll_id(id)?;
    let voter = VoterIdentity::resolve(user.map(|u| u.id), client);
    let vote = PollProcessor::submit_vote(&mut *store, poll_id, request.option_index, &voter).await?;
    Ok(Json(VoteResponse { success: true, vote }))
}

#[instrument(skip(store))]
#[get("/polls/<id>/vote")]
pub async fn has_voted(
    id: &str,
    user: Option<AuthUser>,
    client: ClientIp,
    mut store: Store,
) -> Result<Json<HasVotedResponse>, ApiError> {
    let poll_id = parse_poll_id(id)?;
    let voter = VoterIdentity::resolve(user.map(|u| u.id), client);
    let has_voted = PollProcessor::has_voted(&mut *store, poll_id, &voter).await?;
    Ok(Json(HasVotedResponse { has_voted }))
}

async fn fresh_results(backend: &Backend, poll_id: Uuid) -> Result<PollResultsResponse, ApiError> {
    let mut store = backend.open().await?;
    let results = PollProcessor::poll_results(&mut *store, poll_id).await?;
    Ok(results.into())
}

/// Streams the poll's results, once up front and again after every change.
#[get("/polls/<id>/events")]
pub async fn poll_events(
    state: &State<AppState>,
    id: &str,
    mut shutdown: Shutdown,
) -> Result<EventStream![], ApiError> {
    let poll_id = parse_poll_id(id)?;
    let backend = state.backend.clone();

    let mut subscription = backend.subscribe(poll_id).await?;
    let initial = match fresh_results(&backend, poll_id).await {
        Ok(results) => results,
        Err(e) => {
            subscription.unsubscribe().await;
            return Err(e);
        }
    };

    Ok(EventStream! {
        yield Event::json(&initial).event("results");

        loop {
            let changed = select! {
                changed = subscription.next() => changed,
                _ = &mut shutdown => None,
            };
            if changed.is_none() {
                break;
            }

            match fresh_results(&backend, poll_id).await {
                Ok(results) => yield Event::json(&results).event("results"),
                Err(ApiError::NotFound) => {
                    yield Event::data(poll_id.to_string()).event("deleted");
                    break;
                }
                Err(e) => {
                    error!(%poll_id, "Failed to refresh results: {}", e);
                    break;
                }
            }
        }

        subscription.unsubscribe().await;
    })
}
