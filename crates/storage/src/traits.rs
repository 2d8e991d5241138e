use flexdata_core::{Collection, CollectionId, DataBag, OrderedRecord, Project, ProjectId};

use crate::error::StorageError;

/// Projects and collections.
pub trait Catalog {
    fn create_project(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, StorageError>;

    /// Newest first.
    fn list_projects(&self) -> Result<Vec<Project>, StorageError>;

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StorageError>;

    fn rename_project(&mut self, id: ProjectId, name: &str) -> Result<(), StorageError>;

    fn create_collection(
        &mut self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Collection, StorageError>;

    /// Creation order.
    fn list_collections(&self, project_id: ProjectId) -> Result<Vec<Collection>, StorageError>;

    fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, StorageError>;

    /// Exact name match within the project; the oldest collection wins
    /// when names repeat.
    fn find_collection_by_name(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Option<Collection>, StorageError>;

    fn rename_collection(&mut self, id: CollectionId, name: &str) -> Result<(), StorageError>;

    /// Removes the collection with its fields and rows.
    fn delete_collection(&mut self, id: CollectionId) -> Result<(), StorageError>;

    /// Row data bags of a collection in display order.
    fn row_data(&self, collection_id: CollectionId) -> Result<Vec<DataBag>, StorageError>;
}

/// Persistence of one kind of ordered item (rows or fields).
///
/// Writes are independent: there is no caching and no batching, and the
/// last successful write to an item wins.
pub trait RemoteStore<T: OrderedRecord> {
    /// Items of `scope`, ascending by order key then creation time.
    fn fetch_ordered(&self, scope: CollectionId) -> Result<Vec<T>, StorageError>;

    /// Persist `draft` and return it with the identity the store assigned.
    fn create_item(&mut self, draft: &T) -> Result<T, StorageError>;

    /// Fails with [`StorageError::NotFound`] when `id` does not exist.
    fn update_item(&mut self, id: T::Id, patch: &T::Patch) -> Result<(), StorageError>;

    /// Deleting an id that does not exist succeeds.
    fn delete_item(&mut self, id: T::Id) -> Result<(), StorageError>;
}
