//! Pre-allocated slot store backing the pipeline
//!
//! The ring holds `capacity` reusable slots, where `capacity` is a power of
//! two so that a sequence number maps to its slot with a single mask. Slots
//! are never dropped or reallocated while the ring lives; producers overwrite
//! them in place.
//!
//! The ring itself performs no synchronization. Exclusive access to a slot is
//! handed out by the sequencer: a producer
//! owns slot `seq & mask` between a successful claim of `seq` and its publish,
//! and the consumer may read it between that publish and the point where it
//! advances the consumed cursor past `seq`.

use super::error::{LoggerError, Result};
use std::cell::UnsafeCell;

pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: u64,
}

// SAFETY: slots are only reached through `slot_mut`/`slot`, whose callers
// guarantee the sequencer's exclusive-claim protocol. Values move between
// threads, so `T: Send` is required; no slot is ever shared for concurrent
// mutable access.
unsafe impl<T: Send> Sync for RingBuffer<T> {}
unsafe impl<T: Send> Send for RingBuffer<T> {}

impl<T: Default> RingBuffer<T> {
    /// Allocate `capacity` default-initialised slots
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `capacity` is zero or not a power of two.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(LoggerError::config(
                "RingBuffer",
                format!("capacity must be a non-zero power of two, got {}", capacity),
            ));
        }

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(T::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            mask: capacity as u64 - 1,
        })
    }
}

impl<T> RingBuffer<T> {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot index for a sequence number
    #[inline]
    pub fn index_of(&self, sequence: u64) -> usize {
        (sequence & self.mask) as usize
    }

    /// Mutable access to the slot for a claimed sequence
    ///
    /// # Safety
    ///
    /// The caller must hold the claim for `sequence` and must not have
    /// published it yet. No other reference to the same slot may be alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_mut(&self, sequence: u64) -> &mut T {
        &mut *self.slots[self.index_of(sequence)].get()
    }

    /// Shared access to the slot for a published sequence
    ///
    /// # Safety
    ///
    /// `sequence` must be published and not yet released by advancing the
    /// consumed cursor past it; the returned reference must be dropped
    /// before that advance.
    #[inline]
    pub unsafe fn slot(&self, sequence: u64) -> &T {
        &*self.slots[self.index_of(sequence)].get()
    }
}
