use std::fmt;

/// Mutation performed on a [`RingBuffer`](crate::RingBuffer).
///
/// A push that evicts from the opposite end is still reported as a push, with the evicted
/// items carried in [`BufferChange::removed`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum BufferAction {
    PushFront,
    PushBack,
    PopFront,
    PopBack,
    SetAtIndex,
    Clear,
}

impl BufferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferAction::PushFront => "push_front",
            BufferAction::PushBack => "push_back",
            BufferAction::PopFront => "pop_front",
            BufferAction::PopBack => "pop_back",
            BufferAction::SetAtIndex => "set_at_index",
            BufferAction::Clear => "clear",
        }
    }
}

impl fmt::Display for BufferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed notification describing a single mutation of a [`RingBuffer`](crate::RingBuffer).
///
/// Bulk operations raise exactly one `BufferChange` carrying every item added and every item
/// removed, each in the order the buffer processed them.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct BufferChange<T> {
    pub action: BufferAction,
    /// Logical index of the mutated slot, only present for [`BufferAction::SetAtIndex`].
    pub index: Option<usize>,
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> BufferChange<T> {
    /// Items pushed to the front, with any items evicted from the back.
    pub fn pushed_front(added: Vec<T>, removed: Vec<T>) -> Self {
        Self {
            action: BufferAction::PushFront,
            index: None,
            added,
            removed,
        }
    }

    /// Items pushed to the back, with any items evicted from the front.
    pub fn pushed_back(added: Vec<T>, removed: Vec<T>) -> Self {
        Self {
            action: BufferAction::PushBack,
            index: None,
            added,
            removed,
        }
    }

    pub fn popped_front(removed: Vec<T>) -> Self {
        Self {
            action: BufferAction::PopFront,
            index: None,
            added: vec![],
            removed,
        }
    }

    pub fn popped_back(removed: Vec<T>) -> Self {
        Self {
            action: BufferAction::PopBack,
            index: None,
            added: vec![],
            removed,
        }
    }

    pub fn set_at_index(index: usize, new: T, old: T) -> Self {
        Self {
            action: BufferAction::SetAtIndex,
            index: Some(index),
            added: vec![new],
            removed: vec![old],
        }
    }

    pub fn cleared() -> Self {
        Self {
            action: BufferAction::Clear,
            index: None,
            added: vec![],
            removed: vec![],
        }
    }

    /// True if a push displaced items from the opposite end of a full buffer.
    pub fn evicted(&self) -> bool {
        matches!(self.action, BufferAction::PushFront | BufferAction::PushBack)
            && !self.removed.is_empty()
    }

    /// Transform every carried item, keeping action and index.
    pub fn map<U, F>(&self, mut f: F) -> BufferChange<U>
    where
        F: FnMut(&T) -> U,
    {
        BufferChange {
            action: self.action,
            index: self.index,
            added: self.added.iter().map(&mut f).collect(),
            removed: self.removed.iter().map(&mut f).collect(),
        }
    }
}

/// Receives every [`BufferChange`] raised by a [`RingBuffer`](crate::RingBuffer), synchronously
/// and inside whatever critical section performed the mutation.
pub trait BufferObserver<T>: Send {
    fn on_change(&mut self, change: &BufferChange<T>);
}

impl<T, F> BufferObserver<T> for F
where
    F: FnMut(&BufferChange<T>) + Send,
{
    fn on_change(&mut self, change: &BufferChange<T>) {
        self(change)
    }
}

/// Handle returned by [`RingBuffer::subscribe`](crate::RingBuffer::subscribe), used to
/// unsubscribe.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ObserverId(pub(crate) u64);
