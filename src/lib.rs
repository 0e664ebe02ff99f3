use std::sync::Arc;

use config::Config;
use ingest::IngestHandle;
use service::LocationService;
use users::UserDirectory;

pub mod aggregator;
pub mod config;
pub mod error;
pub mod geo;
pub mod history;
pub mod ingest;
pub mod middleware;
pub mod proximity;
pub mod router;
pub mod routes;
pub mod service;
pub mod users;
pub mod utils;
pub mod validation;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LocationService>,
    pub users: Arc<UserDirectory>,
    pub ingest: IngestHandle,
    pub config: Config,
}
