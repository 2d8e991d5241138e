use std::collections::HashSet;

use flexdata_core::{Collection, CollectionId, DataBag, OrderedRecord, Project, ProjectId};
use flexdata_storage::{Catalog, RemoteStore, StorageError};

/// Operation classes a [`FlakyStore`] can be told to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Create,
    Update,
    Delete,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Wraps a store and rejects the selected operation classes with
/// [`StorageError::Unavailable`]. Everything else passes through.
pub struct FlakyStore<S> {
    inner: S,
    failing: HashSet<StoreOp>,
    rejected: usize,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: HashSet::new(),
            rejected: 0,
        }
    }

    pub fn fail(&mut self, op: StoreOp) -> &mut Self {
        self.failing.insert(op);
        self
    }

    pub fn heal(&mut self, op: StoreOp) -> &mut Self {
        self.failing.remove(&op);
        self
    }

    pub fn heal_all(&mut self) {
        self.failing.clear();
    }

    /// Writes rejected so far. Reads are not counted.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_read(&self) -> Result<(), StorageError> {
        if self.failing.contains(&StoreOp::Read) {
            return Err(StorageError::Unavailable(format!(
                "injected {} failure",
                StoreOp::Read.as_str()
            )));
        }
        Ok(())
    }

    fn check_write(&mut self, op: StoreOp) -> Result<(), StorageError> {
        if self.failing.contains(&op) {
            self.rejected += 1;
            return Err(StorageError::Unavailable(format!(
                "injected {} failure",
                op.as_str()
            )));
        }
        Ok(())
    }
}

impl<T, S> RemoteStore<T> for FlakyStore<S>
where
    T: OrderedRecord,
    S: RemoteStore<T>,
{
    fn fetch_ordered(&self, scope: CollectionId) -> Result<Vec<T>, StorageError> {
        self.check_read()?;
        self.inner.fetch_ordered(scope)
    }

    fn create_item(&mut self, draft: &T) -> Result<T, StorageError> {
        self.check_write(StoreOp::Create)?;
        self.inner.create_item(draft)
    }

    fn update_item(&mut self, id: T::Id, patch: &T::Patch) -> Result<(), StorageError> {
        self.check_write(StoreOp::Update)?;
        self.inner.update_item(id, patch)
    }

    fn delete_item(&mut self, id: T::Id) -> Result<(), StorageError> {
        self.check_write(StoreOp::Delete)?;
        self.inner.delete_item(id)
    }
}

impl<S: Catalog> Catalog for FlakyStore<S> {
    fn create_project(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, StorageError> {
        self.check_write(StoreOp::Create)?;
        self.inner.create_project(name, description)
    }

    fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        self.check_read()?;
        self.inner.list_projects()
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StorageError> {
        self.check_read()?;
        self.inner.get_project(id)
    }

    fn rename_project(&mut self, id: ProjectId, name: &str) -> Result<(), StorageError> {
        self.check_write(StoreOp::Update)?;
        self.inner.rename_project(id, name)
    }

    fn create_collection(
        &mut self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Collection, StorageError> {
        self.check_write(StoreOp::Create)?;
        self.inner.create_collection(project_id, name)
    }

    fn list_collections(&self, project_id: ProjectId) -> Result<Vec<Collection>, StorageError> {
        self.check_read()?;
        self.inner.list_collections(project_id)
    }

    fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, StorageError> {
        self.check_read()?;
        self.inner.get_collection(id)
    }

    fn find_collection_by_name(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Option<Collection>, StorageError> {
        self.check_read()?;
        self.inner.find_collection_by_name(project_id, name)
    }

    fn rename_collection(&mut self, id: CollectionId, name: &str) -> Result<(), StorageError> {
        self.check_write(StoreOp::Update)?;
        self.inner.rename_collection(id, name)
    }

    fn delete_collection(&mut self, id: CollectionId) -> Result<(), StorageError> {
        self.check_write(StoreOp::Delete)?;
        self.inner.delete_collection(id)
    }

    fn row_data(&self, collection_id: CollectionId) -> Result<Vec<DataBag>, StorageError> {
        self.check_read()?;
        self.inner.row_data(collection_id)
    }
}
