pub mod app_core;
mod async_runtime;
pub mod domain;
pub mod feedback;
pub mod history;
pub mod logging;
pub mod platform;
pub mod ports;
pub mod remote;
pub mod router;
pub mod scroll;
pub mod viewmodel;

pub use app_core::*;
pub use domain::AppState;
pub use history::{
    ExitGuard, HistoryCoordinator, HistoryError, ListenerId, Navigation, Phase, PopstateOutcome,
    UiStateBag,
};
pub use platform::SimulatedPlatform;
pub use ports::*;
pub use remote::HttpRemoteApi;
pub use viewmodel::*;
