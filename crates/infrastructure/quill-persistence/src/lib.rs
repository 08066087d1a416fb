mod api;
mod error;
mod maintenance;
mod memory;
mod redb_store;

pub use api::*;
pub use error::*;
pub use memory::MemorySessionStorage;
pub use redb_store::RedbSessionStorage;
