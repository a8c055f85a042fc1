pub mod auth;
pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod memory;
pub mod processor;
pub mod queries;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::{models::*, error::*, identity::*};

use rocket::{catchers, routes, Build, Rocket};

use crate::{config::Config, cors::CORS, routes::AppState};

/// Mounts the API on a fresh Rocket instance.
pub fn build_rocket(state: AppState, config: &Config) -> Rocket<Build> {
    rocket::build()
        .attach(CORS::new(&config.cors_origins))
        .manage(state)
        .mount(
            "/api",
            routes![
                routes::create_poll,
                routes::list_polls,
                routes::get_poll,
                routes::update_poll,
                routes::toggle_poll,
                routes::delete_poll,
                routes::cast_vote,
                routes::has_voted,
                routes::poll_events,
                routes::all_options,
            ],
        )
        .register(
            "/",
            catchers![
                catchers::bad_request,
                catchers::unauthorized,
                catchers::not_found,
                catchers::unprocessable_entity,
                catchers::internal_error,
            ],
        )
}
