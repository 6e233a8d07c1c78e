//! # Trade-Feed-Buffer
//! Fixed capacity, double-ended ring buffer with overwrite-on-full semantics and typed change
//! notification.
//!
//! Observers receive one [`BufferChange`] per mutation, carrying the [`BufferAction`] performed
//! together with the items added and removed, so a view can patch a single row on
//! [`BufferAction::SetAtIndex`] and fully refresh on anything else. A second buffer of equal
//! capacity can track the first one item for item through [`subscribe_mirror`].
//!
//! ```
//! use trade_feed_buffer::{BufferChange, RingBuffer};
//!
//! let mut buffer = RingBuffer::new(3).unwrap();
//! buffer.subscribe(|change: &BufferChange<u32>| println!("{:?}", change.action));
//!
//! buffer.push_front_n([1, 2, 3, 4]);
//! assert_eq!(buffer.to_vec(), vec![4, 3, 2]);
//! ```

/// [`BufferChange`] notification, [`BufferAction`] and the [`BufferObserver`] seam.
pub mod change;

/// All errors generated in `trade-feed-buffer`.
pub mod error;

/// Lockstep replay of one buffer onto another of equal capacity.
pub mod mirror;

/// The [`RingBuffer`] itself.
pub mod ring;

pub use change::{BufferAction, BufferChange, BufferObserver, ObserverId};
pub use error::BufferError;
pub use mirror::{replay, subscribe_mirror};
pub use ring::RingBuffer;
