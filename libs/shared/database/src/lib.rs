pub mod error;
pub mod store;
pub mod memory;
pub mod redis_store;
pub mod state;

pub use error::StoreError;
pub use store::*;
pub use memory::InMemoryStore;
pub use redis_store::RedisStore;
pub use state::AppState;
