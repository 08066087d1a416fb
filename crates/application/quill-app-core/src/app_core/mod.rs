pub mod commands;
pub mod events;
pub mod reducer;
pub mod store;
pub mod unhandled;

pub use commands::{AppCommand, Dispatched};
pub use events::DomainEvent;
pub use reducer::{reduce, Effect};
pub use store::AppStore;
pub use unhandled::{inspect_unhandled, Disposition};
