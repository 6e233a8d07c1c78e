use crate::{
    change::{BufferChange, BufferObserver, ObserverId},
    error::BufferError,
};
use std::fmt;

/// Fixed capacity double-ended ring buffer that overwrites on full.
///
/// Logical index `0` is the front. Pushing to the front of a full buffer evicts the back item,
/// pushing to the back of a full buffer evicts the front item. Every mutation raises one
/// [`BufferChange`] to all subscribed [`BufferObserver`]s.
///
/// The buffer performs no internal locking; callers sharing it across tasks must guard it.
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    size: usize,
    observers: Vec<(ObserverId, Box<dyn BufferObserver<T>>)>,
    next_observer_id: u64,
}

impl<T> RingBuffer<T>
where
    T: Clone,
{
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }

        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            size: 0,
            observers: Vec::new(),
            next_observer_id: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    /// Register an observer that receives every subsequent [`BufferChange`].
    pub fn subscribe<Observer>(&mut self, observer: Observer) -> ObserverId
    where
        Observer: BufferObserver<T> + 'static,
    {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` if the observer was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn push_front(&mut self, item: T) {
        self.push_front_n([item])
    }

    pub fn push_back(&mut self, item: T) {
        self.push_back_n([item])
    }

    /// Equivalent to pushing each item to the front in iteration order, so the last item ends
    /// up at index `0`. Raises a single [`BufferChange`].
    pub fn push_front_n<Items>(&mut self, items: Items)
    where
        Items: IntoIterator<Item = T>,
    {
        let notify = !self.observers.is_empty();
        let mut added = Vec::new();
        let mut removed = Vec::new();

        for item in items {
            if self.is_full() {
                let back = self.physical(self.size - 1);
                self.size -= 1;
                if let Some(evicted) = self.slots[back].take() {
                    if notify {
                        removed.push(evicted);
                    }
                }
            }

            self.head = (self.head + self.capacity() - 1) % self.capacity();
            if notify {
                added.push(item.clone());
            }
            self.slots[self.head] = Some(item);
            self.size += 1;
        }

        if notify && !added.is_empty() {
            self.notify(BufferChange::pushed_front(added, removed));
        }
    }

    /// Equivalent to pushing each item to the back in iteration order, so the last item ends
    /// up at index `size - 1`. Raises a single [`BufferChange`].
    pub fn push_back_n<Items>(&mut self, items: Items)
    where
        Items: IntoIterator<Item = T>,
    {
        let notify = !self.observers.is_empty();
        let mut added = Vec::new();
        let mut removed = Vec::new();

        for item in items {
            if self.is_full() {
                let front = self.head;
                self.head = (self.head + 1) % self.capacity();
                self.size -= 1;
                if let Some(evicted) = self.slots[front].take() {
                    if notify {
                        removed.push(evicted);
                    }
                }
            }

            let tail = self.physical(self.size);
            if notify {
                added.push(item.clone());
            }
            self.slots[tail] = Some(item);
            self.size += 1;
        }

        if notify && !added.is_empty() {
            self.notify(BufferChange::pushed_back(added, removed));
        }
    }

    pub fn pop_front(&mut self) -> Result<T, BufferError> {
        let mut popped = self.pop_front_n(1)?;
        popped.pop().ok_or(BufferError::Empty)
    }

    pub fn pop_back(&mut self) -> Result<T, BufferError> {
        let mut popped = self.pop_back_n(1)?;
        popped.pop().ok_or(BufferError::Empty)
    }

    /// Remove `count` items from the front, returned in removal order. Fails without removing
    /// anything if fewer than `count` items are held.
    pub fn pop_front_n(&mut self, count: usize) -> Result<Vec<T>, BufferError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if count > self.size {
            return Err(BufferError::Empty);
        }

        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            let front = self.head;
            self.head = (self.head + 1) % self.capacity();
            self.size -= 1;
            removed.extend(self.slots[front].take());
        }

        self.notify_with(|| BufferChange::popped_front(removed.clone()));
        Ok(removed)
    }

    /// Remove `count` items from the back, returned in removal order. Fails without removing
    /// anything if fewer than `count` items are held.
    pub fn pop_back_n(&mut self, count: usize) -> Result<Vec<T>, BufferError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if count > self.size {
            return Err(BufferError::Empty);
        }

        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            let back = self.physical(self.size - 1);
            self.size -= 1;
            removed.extend(self.slots[back].take());
        }

        self.notify_with(|| BufferChange::popped_back(removed.clone()));
        Ok(removed)
    }

    pub fn get(&self, index: usize) -> Result<&T, BufferError> {
        let physical = self.checked_physical(index)?;
        self.slots[physical].as_ref().ok_or(BufferError::Empty)
    }

    /// Replace the item at `index`, returning the previous item.
    pub fn set(&mut self, index: usize, item: T) -> Result<T, BufferError> {
        let physical = self.checked_physical(index)?;
        let old = self.slots[physical]
            .replace(item.clone())
            .ok_or(BufferError::Empty)?;

        self.notify_with(|| BufferChange::set_at_index(index, item, old.clone()));
        Ok(old)
    }

    /// Empty the buffer in constant time. Stale slots are dropped lazily as they are
    /// overwritten by later pushes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.size = 0;
        self.notify_with(BufferChange::cleared);
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.size).filter_map(move |index| self.slots[self.physical(index)].as_ref())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    fn physical(&self, index: usize) -> usize {
        (self.head + index) % self.capacity()
    }

    fn checked_physical(&self, index: usize) -> Result<usize, BufferError> {
        if self.is_empty() {
            Err(BufferError::Empty)
        } else if index >= self.size {
            Err(BufferError::IndexOutOfRange {
                index,
                size: self.size,
            })
        } else {
            Ok(self.physical(index))
        }
    }

    fn notify_with<F>(&mut self, change: F)
    where
        F: FnOnce() -> BufferChange<T>,
    {
        if !self.observers.is_empty() {
            self.notify(change());
        }
    }

    fn notify(&mut self, change: BufferChange<T>) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_change(&change);
        }
    }
}

impl<T> fmt::Debug for RingBuffer<T>
where
    T: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("items", &self.to_vec())
            .field("observers", &self.observers.len())
            .finish()
    }
}
