mod backend;
mod memory;
mod schema;
mod session_state;
mod types;

pub use backend::SessionStorage;
pub use memory::MemoryStorage;
pub use schema::Database;
pub use types::{DatabaseError, StorageError};
