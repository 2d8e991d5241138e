use serde_json::Value;
use tracing::debug;

use flexdata_core::{
    FieldDef, FieldDefinition, FieldId, FieldPatch, OrderedRecord, Row, RowId, RowPatch, SortKey,
    allocate_key, fits_between,
};

use crate::error::EngineError;
use crate::outbox::{Outbox, PendingWrite};

#[derive(Debug, Clone, Copy)]
struct DragState<Id> {
    id: Id,
    origin: usize,
}

/// In-memory ordered sequence of rows or fields.
///
/// Every mutation is applied locally first and queues its remote write in
/// the list's outbox. Nothing here waits for the store; see
/// [`crate::sync::dispatch`] for draining the outbox.
#[derive(Debug)]
pub struct OrderedList<T: OrderedRecord> {
    items: Vec<T>,
    outbox: Outbox<T>,
    drag: Option<DragState<T::Id>>,
}

impl<T: OrderedRecord> Default for OrderedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OrderedRecord> OrderedList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            outbox: Outbox::new(),
            drag: None,
        }
    }

    /// Replace the sequence. Queued writes are kept.
    pub fn load(&mut self, mut items: Vec<T>) {
        items.sort_by(T::display_order);
        self.items = items;
        self.drag = None;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = SortKey> + '_ {
        self.items.iter().map(OrderedRecord::sort_key)
    }

    pub fn pending(&self) -> &Outbox<T> {
        &self.outbox
    }

    pub fn take_pending(&mut self) -> Vec<PendingWrite<T>> {
        self.outbox.drain()
    }

    fn require(&self, id: T::Id) -> Result<usize, EngineError> {
        self.position(id)
            .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))
    }

    // ========================================================================
    // Reordering
    // ========================================================================

    /// Move `id` so it ends up at `target_index` (clamped to the list).
    ///
    /// Returns the moved item's new key, or `None` when the item already sits
    /// at the target and nothing changed.
    pub fn move_item(
        &mut self,
        id: T::Id,
        target_index: usize,
    ) -> Result<Option<SortKey>, EngineError> {
        self.cancel_drag();
        let from = self.require(id)?;
        let target = target_index.min(self.items.len() - 1);
        if from == target {
            return Ok(None);
        }
        let item = self.items.remove(from);
        self.items.insert(target, item);
        Ok(Some(self.settle(target)))
    }

    /// Start a drag gesture. Hover positions only rearrange the local
    /// sequence; keys and writes are computed once, on drop.
    pub fn begin_drag(&mut self, id: T::Id) -> Result<(), EngineError> {
        self.cancel_drag();
        let origin = self.require(id)?;
        self.drag = Some(DragState { id, origin });
        Ok(())
    }

    pub fn hover(&mut self, target_index: usize) -> Result<(), EngineError> {
        let drag = self.drag.ok_or(EngineError::NoActiveDrag)?;
        let from = self.require(drag.id)?;
        let target = target_index.min(self.items.len() - 1);
        if from != target {
            let item = self.items.remove(from);
            self.items.insert(target, item);
        }
        Ok(())
    }

    pub fn drop_drag(&mut self) -> Result<Option<SortKey>, EngineError> {
        let drag = self.drag.take().ok_or(EngineError::NoActiveDrag)?;
        let at = self.require(drag.id)?;
        if at == drag.origin {
            return Ok(None);
        }
        Ok(Some(self.settle(at)))
    }

    /// Abandon the current drag and put the item back where it started.
    pub fn cancel_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if let Some(at) = self.position(drag.id) {
            let item = self.items.remove(at);
            let origin = drag.origin.min(self.items.len());
            self.items.insert(origin, item);
        }
    }

    /// Give the item at `index` a key between its neighbors and queue the
    /// write. Falls back to renumbering the whole list when no such key
    /// exists.
    fn settle(&mut self, index: usize) -> SortKey {
        let left = index.checked_sub(1).map(|i| self.items[i].sort_key());
        let right = self.items.get(index + 1).map(OrderedRecord::sort_key);
        let key = allocate_key(left, right);

        if !fits_between(key, left, right) {
            self.renumber();
            return self.items[index].sort_key();
        }

        let item = &mut self.items[index];
        item.set_sort_key(key);
        let id = item.id();
        debug!(%id, %key, "moved item");
        self.outbox.push(PendingWrite::Update {
            id,
            patch: T::reorder_patch(key),
        });
        key
    }

    fn renumber(&mut self) {
        let mut changed = 0usize;
        for (index, item) in self.items.iter_mut().enumerate() {
            let key = SortKey::nth(index);
            if item.sort_key() != key {
                item.set_sort_key(key);
                self.outbox.push(PendingWrite::Update {
                    id: item.id(),
                    patch: T::reorder_patch(key),
                });
                changed += 1;
            }
        }
        debug!(changed, "renumbered list, key space exhausted");
    }

    // ========================================================================
    // Insert / remove / update
    // ========================================================================

    /// Append `draft` with key max + 1000 and queue its create. The returned
    /// id is provisional until the store confirms the insert.
    pub fn insert(&mut self, mut draft: T) -> T::Id {
        let key = SortKey::after_max(self.keys());
        draft.set_sort_key(key);
        let provisional = draft.id();
        debug!(id = %provisional, %key, "inserted item");
        self.outbox.push(PendingWrite::Create {
            provisional,
            draft: draft.clone(),
        });
        self.items.push(draft);
        provisional
    }

    /// Remove locally and queue the delete. A failed delete does not bring
    /// the item back.
    pub fn remove(&mut self, id: T::Id) -> Result<T, EngineError> {
        self.cancel_drag();
        let at = self.require(id)?;
        let item = self.items.remove(at);
        debug!(%id, "removed item");
        self.outbox.push(PendingWrite::Delete { id });
        Ok(item)
    }

    fn update_with(
        &mut self,
        id: T::Id,
        apply: impl FnOnce(&mut T) -> T::Patch,
    ) -> Result<(), EngineError> {
        let at = self.require(id)?;
        let patch = apply(&mut self.items[at]);
        debug!(%id, ?patch, "updated item");
        self.outbox.push(PendingWrite::Update { id, patch });
        Ok(())
    }

    /// Swap a provisional item's identity for the one the store assigned.
    /// Returns false when the item is no longer in the list.
    pub fn confirm_insert(&mut self, provisional: T::Id, confirmed: &T) -> bool {
        let Some(at) = self.position(provisional) else {
            return false;
        };
        self.items[at].adopt_identity(confirmed);
        if let Some(drag) = self.drag.as_mut().filter(|d| d.id == provisional) {
            drag.id = confirmed.id();
        }
        true
    }

    /// Drop an insert the store rejected. No write is queued.
    pub fn rollback_insert(&mut self, provisional: T::Id) -> Option<T> {
        if self.drag.is_some_and(|d| d.id == provisional) {
            self.drag = None;
        }
        let at = self.position(provisional)?;
        debug!(id = %provisional, "rolled back insert");
        Some(self.items.remove(at))
    }
}

impl OrderedList<Row> {
    /// Set one key of a row's data bag and queue the whole merged bag.
    pub fn patch_item_data(
        &mut self,
        id: RowId,
        key: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        self.update_with(id, |row| {
            row.data.insert(key, value);
            RowPatch::Data(row.data.clone())
        })
    }
}

impl OrderedList<FieldDef> {
    /// Change label, type or required flag. The internal key never changes.
    pub fn update_definition(
        &mut self,
        id: FieldId,
        definition: FieldDefinition,
    ) -> Result<(), EngineError> {
        self.update_with(id, |field| {
            field.apply_definition(&definition);
            FieldPatch::Definition(definition)
        })
    }
}
