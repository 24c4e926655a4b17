mod database;
mod redis;
mod sessions;
mod state_builder;

pub use database::connect_and_migrate;
pub use redis::build_redis_client;
pub use sessions::{build_memory_session_layer, build_postgres_session_layer};
pub use state_builder::{build_app_state, spawn_in_memory_cleanup};
