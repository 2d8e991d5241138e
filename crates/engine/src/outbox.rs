use std::collections::VecDeque;

use flexdata_core::OrderedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
    Delete,
}

impl WriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A remote write queued by an optimistic local mutation.
#[derive(Debug, Clone)]
pub enum PendingWrite<T: OrderedRecord> {
    /// `provisional` is the locally generated id the item carries until the
    /// store confirms it.
    Create { provisional: T::Id, draft: T },
    Update { id: T::Id, patch: T::Patch },
    Delete { id: T::Id },
}

impl<T: OrderedRecord> PendingWrite<T> {
    pub fn kind(&self) -> WriteKind {
        match self {
            Self::Create { .. } => WriteKind::Create,
            Self::Update { .. } => WriteKind::Update,
            Self::Delete { .. } => WriteKind::Delete,
        }
    }

    pub fn target(&self) -> T::Id {
        match self {
            Self::Create { provisional, .. } => *provisional,
            Self::Update { id, .. } | Self::Delete { id } => *id,
        }
    }
}

/// FIFO of pending writes for one ordered list.
#[derive(Debug)]
pub struct Outbox<T: OrderedRecord> {
    queue: VecDeque<PendingWrite<T>>,
}

impl<T: OrderedRecord> Default for Outbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OrderedRecord> Outbox<T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, write: PendingWrite<T>) {
        self.queue.push_back(write);
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain(&mut self) -> Vec<PendingWrite<T>> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
