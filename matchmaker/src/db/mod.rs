pub mod backends;
mod connection;
pub mod layers;
pub mod repository;
pub(crate) mod schema;
pub mod traits;

pub use backends::libsql::LibSqlScoreStore;
pub use backends::memory::{MemoryDataAccess, MemoryScoreStore};
pub use backends::rest::RestDataAccess;
pub use connection::Database;
pub use layers::TimeoutLayer;
pub use traits::*;
