#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session.redb has an unknown format")]
    Corrupt,
    #[error("session.redb was written by a newer Quill (schema_version={found}, supported={supported})")]
    NewerSchema { found: u32, supported: u32 },
    #[error("session.redb is held by another handle in this process")]
    Busy,
    #[error("could not determine a session storage directory")]
    NoStorageDir,
    #[error("session storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("session backend: {0}")]
    Backend(Box<redb::Error>),
    #[error("session storage lock poisoned")]
    Poisoned,
}

impl From<redb::Error> for StorageError {
    fn from(value: redb::Error) -> Self {
        match value {
            redb::Error::DatabaseAlreadyOpen => Self::Busy,
            other => Self::Backend(Box::new(other)),
        }
    }
}

macro_rules! via_redb_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StorageError {
                fn from(value: $ty) -> Self {
                    redb::Error::from(value).into()
                }
            }
        )*
    };
}

via_redb_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
