use crate::{
    change::{BufferAction, BufferChange, ObserverId},
    error::BufferError,
    ring::RingBuffer,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Keep `mirror` in lockstep with `observed`, storing `transform(item)` for every item.
///
/// The mirror is first re-seeded from the current contents of `observed`, then every
/// subsequent [`BufferChange`] is replayed against it. Both buffers must have equal capacity so
/// evictions line up one to one.
///
/// The mirror lock is taken while `observed` is being mutated, so callers must never hold the
/// mirror lock while mutating `observed`.
pub fn subscribe_mirror<T, U, F>(
    observed: &mut RingBuffer<T>,
    mirror: Arc<Mutex<RingBuffer<U>>>,
    transform: F,
) -> Result<ObserverId, BufferError>
where
    T: Clone + 'static,
    U: Clone + Send + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    {
        let mut mirror = mirror.lock();
        if mirror.capacity() != observed.capacity() {
            return Err(BufferError::CapacityMismatch {
                observed: observed.capacity(),
                observer: mirror.capacity(),
            });
        }

        mirror.clear();
        mirror.push_back_n(observed.iter().map(&transform));
    }

    Ok(observed.subscribe(move |change: &BufferChange<T>| {
        let mut mirror = mirror.lock();
        if let Err(error) = replay(&mut mirror, change, &transform) {
            warn!(%error, action = %change.action, "failed to replay change onto mirrored buffer");
        }
    }))
}

/// Apply one [`BufferChange`] raised by another buffer to `mirror`.
pub fn replay<T, U, F>(
    mirror: &mut RingBuffer<U>,
    change: &BufferChange<T>,
    transform: F,
) -> Result<(), BufferError>
where
    U: Clone,
    F: Fn(&T) -> U,
{
    match change.action {
        BufferAction::PushFront => {
            mirror.push_front_n(change.added.iter().map(transform));
        }
        BufferAction::PushBack => {
            mirror.push_back_n(change.added.iter().map(transform));
        }
        BufferAction::PopFront => {
            mirror.pop_front_n(change.removed.len())?;
        }
        BufferAction::PopBack => {
            mirror.pop_back_n(change.removed.len())?;
        }
        BufferAction::SetAtIndex => {
            let index = change.index.ok_or(BufferError::Empty)?;
            let item = change.added.first().ok_or(BufferError::Empty)?;
            mirror.set(index, transform(item))?;
        }
        BufferAction::Clear => mirror.clear(),
    }

    Ok(())
}
