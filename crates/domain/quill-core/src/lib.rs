pub mod error;
pub mod post;
pub mod query;
pub mod request;
pub mod route;

pub use error::{ApiError, ApiErrorKind, RouteDecodeError};
pub use post::{Post, PostId, PostPayload, User};
pub use request::{RequestSeq, RequestStatus, RequestTracker, TrackerError};
pub use route::{ExitCheck, PostRoute, Route, RouteName, SearchRoute};
