pub mod change_requests;
pub mod commands;
pub mod config;
pub mod constants;
pub mod crud;
pub mod db;
pub mod documents;
pub mod error;
pub mod identity;
pub mod models;
pub mod query;
pub mod review;
pub mod schema;
pub mod state;
pub mod stats;
pub mod users;
pub mod utils;
pub mod workflow;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use identity::Actor;
pub use state::AppState;
