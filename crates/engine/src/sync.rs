use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use flexdata_core::OrderedRecord;
use flexdata_storage::RemoteStore;

use crate::error::RemoteWriteError;
use crate::ordered::OrderedList;
use crate::outbox::{PendingWrite, WriteKind};

/// One write the store rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure<Id> {
    pub kind: WriteKind,
    pub id: Id,
    pub error: RemoteWriteError,
}

/// Outcome of draining an outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport<Id> {
    /// Successful updates and deletes.
    pub applied: usize,
    /// Confirmed inserts as `(provisional, confirmed)` id pairs.
    pub created: Vec<(Id, Id)>,
    /// Provisional ids of inserts the store rejected; they are gone from
    /// the list.
    pub rolled_back: Vec<Id>,
    pub failures: Vec<SyncFailure<Id>>,
}

impl<Id> Default for SyncReport<Id> {
    fn default() -> Self {
        Self {
            applied: 0,
            created: Vec::new(),
            rolled_back: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<Id> SyncReport<Id> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Send every queued write of `list` to `store`, oldest first.
///
/// Each write is independent: a failure is logged and reported, and the
/// remaining writes still go out. Only a rejected create changes local
/// state (the item is rolled back). Writes aimed at a rolled-back insert
/// are dropped; writes aimed at a confirmed insert are redirected to the
/// store-assigned id.
pub fn dispatch<T, S>(list: &mut OrderedList<T>, store: &mut S) -> SyncReport<T::Id>
where
    T: OrderedRecord,
    S: RemoteStore<T> + ?Sized,
{
    let writes = list.take_pending();
    let mut report = SyncReport::default();
    let mut confirmed_ids: HashMap<T::Id, T::Id> = HashMap::new();
    let mut rejected: HashSet<T::Id> = HashSet::new();

    for write in writes {
        let kind = write.kind();
        let target = write.target();
        if rejected.contains(&target) {
            debug!(id = %target, kind = kind.as_str(), "dropping write for rolled-back insert");
            continue;
        }

        let result = match write {
            PendingWrite::Create { provisional, draft } => match store.create_item(&draft) {
                Ok(confirmed) => {
                    list.confirm_insert(provisional, &confirmed);
                    confirmed_ids.insert(provisional, confirmed.id());
                    report.created.push((provisional, confirmed.id()));
                    continue;
                }
                Err(err) => {
                    list.rollback_insert(provisional);
                    rejected.insert(provisional);
                    report.rolled_back.push(provisional);
                    Err(err)
                }
            },
            PendingWrite::Update { id, patch } => {
                let id = confirmed_ids.get(&id).copied().unwrap_or(id);
                store.update_item(id, &patch)
            }
            PendingWrite::Delete { id } => {
                let id = confirmed_ids.get(&id).copied().unwrap_or(id);
                store.delete_item(id)
            }
        };

        match result {
            Ok(()) => report.applied += 1,
            Err(err) => {
                let error = RemoteWriteError::from(err);
                warn!(
                    id = %target,
                    kind = kind.as_str(),
                    code = error.code.as_deref().unwrap_or("unknown"),
                    "remote write failed: {}",
                    error.message
                );
                report.failures.push(SyncFailure {
                    kind,
                    id: target,
                    error,
                });
            }
        }
    }

    report
}
