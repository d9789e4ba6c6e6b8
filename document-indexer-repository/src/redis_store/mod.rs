//! Redis implementation of the store clients.
//!
//! Both clients share one [`StoreConnection`]; the vector index relies on the
//! RediSearch module (`FT.*` commands).

mod connection;
mod index_config;
mod metadata;
mod queries;
mod vector;

pub use connection::StoreConnection;
pub use index_config::create_index_args;
pub use metadata::RedisMetadataStore;
pub(crate) use metadata::union_in_order;
pub use vector::RedisVectorIndex;
