pub mod error;
pub mod object_store;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use object_store::{DirObjectStore, ObjectStore};
pub use sqlite::SqliteStorage;
pub use traits::*;
