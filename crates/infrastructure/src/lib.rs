//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_redirect_record_store;
mod postgres_redirect_record_store;
mod redis_redirect_record_store;

pub use in_memory_redirect_record_store::InMemoryRedirectRecordStore;
pub use postgres_redirect_record_store::PostgresRedirectRecordStore;
pub use redis_redirect_record_store::RedisRedirectRecordStore;
