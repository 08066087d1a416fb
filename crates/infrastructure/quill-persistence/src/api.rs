/// Session-scoped string key/value storage, shaped after the browser's
/// `sessionStorage`. Values are opaque to the storage (the history layer
/// stores JSON).
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, crate::StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), crate::StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), crate::StorageError>;
    fn clear(&self) -> Result<(), crate::StorageError>;
}
