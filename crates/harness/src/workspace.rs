use tempfile::TempDir;

use flexdata_core::{Collection, FieldType, Project};
use flexdata_engine::{CollectionSession, EngineError, ProjectSession};
use flexdata_storage::{Catalog, SqliteStorage, StorageError};

/// A store with one project, for scenario tests.
pub struct TestWorkspace {
    pub storage: SqliteStorage,
    pub project: Project,
    dir: Option<TempDir>,
}

impl TestWorkspace {
    /// In-memory database.
    pub fn new() -> Result<Self, StorageError> {
        let mut storage = SqliteStorage::open_in_memory()?;
        let project = storage.create_project("Test Project", None)?;
        Ok(Self {
            storage,
            project,
            dir: None,
        })
    }

    /// Database file in a temporary directory, removed on drop.
    pub fn on_disk() -> Result<Self, StorageError> {
        let dir = TempDir::new()?;
        let mut storage = SqliteStorage::open(&db_path(&dir))?;
        let project = storage.create_project("Test Project", None)?;
        Ok(Self {
            storage,
            project,
            dir: Some(dir),
        })
    }

    /// Open a second connection to the same database file. In-memory
    /// workspaces have no file to share.
    pub fn connect(&self) -> Result<SqliteStorage, StorageError> {
        match &self.dir {
            Some(dir) => SqliteStorage::open(&db_path(dir)),
            None => Err(StorageError::Unavailable(
                "in-memory workspace has no database file".into(),
            )),
        }
    }

    pub fn create_collection(&mut self, name: &str) -> Result<Collection, StorageError> {
        self.storage.create_collection(self.project.id, name)
    }

    pub fn project_session(&self) -> ProjectSession {
        ProjectSession::open(&self.storage, self.project.clone())
    }

    pub fn open(&self, collection: &Collection) -> CollectionSession {
        CollectionSession::open(&self.storage, collection.clone())
    }

    /// Create a collection, add `fields` as `(label, type, required)` and
    /// sync them. The returned session holds the confirmed field list.
    pub fn collection_with_fields(
        &mut self,
        name: &str,
        fields: &[(&str, FieldType, bool)],
    ) -> Result<CollectionSession, EngineError> {
        let collection = self.create_collection(name)?;
        let mut session = self.open(&collection);
        for (label, field_type, required) in fields {
            session.add_field(label, *field_type, *required)?;
        }
        let report = session.sync(&mut self.storage);
        if let Some(failure) = report.fields.failures.into_iter().next() {
            return Err(failure.error.into());
        }
        Ok(session)
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("flexdata.db").to_string_lossy().into_owned()
}
