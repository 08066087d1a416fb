/// Failure of a call against the posts API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response was obtained at all.
    #[error("network error: {message}")]
    Network { message: String },
    /// A response was obtained but it signals failure.
    #[error("api error {status} ({tag}): {message}")]
    Api {
        status: u16,
        tag: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Network,
    NotFound,
    Unauthorized,
    Other,
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn api(status: u16, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            tag: tag.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Network { .. } => None,
            ApiError::Api { status, .. } => Some(*status),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self.status_code() {
            None => ApiErrorKind::Network,
            Some(404) => ApiErrorKind::NotFound,
            Some(401) => ApiErrorKind::Unauthorized,
            Some(_) => ApiErrorKind::Other,
        }
    }

    /// Human readable message, as shown next to a failed action.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network { message } | ApiError::Api { message, .. } => message,
        }
    }
}

/// A persisted blob or URL that does not name any known route.
#[derive(Debug, thiserror::Error)]
pub enum RouteDecodeError {
    #[error("route json has no 'name' field")]
    MissingName,
    #[error("unknown route name '{0}'")]
    UnknownName(String),
    #[error("no route matches path '{0}'")]
    UnknownPath(String),
    #[error("malformed route json: {0}")]
    Malformed(#[from] serde_json::Error),
}
