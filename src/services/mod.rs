pub mod analysis;
pub mod assistant;
pub mod auth;
pub mod ingest;
pub mod store;
