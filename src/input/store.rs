//! Single-slot mailbox between the connection task and the consumer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::mapper::InputSample;

/// Latest mapped sample, guarded by one mutex.
///
/// Writers replace the whole sample; readers copy it out. A reader sees some
/// complete past sample, never a mix of two.
#[derive(Debug, Default)]
pub struct SampleStore {
    slot: Mutex<InputSample>,
}

impl SampleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored sample.
    pub fn replace(&self, sample: InputSample) {
        *self.lock() = sample;
    }

    /// Copy of the stored sample.
    #[must_use]
    pub fn latest(&self) -> InputSample {
        *self.lock()
    }

    /// Reset to the zero sample.
    pub fn reset(&self) {
        self.replace(InputSample::default());
    }

    fn lock(&self) -> MutexGuard<'_, InputSample> {
        // InputSample is plain data; a panicked writer cannot leave it half-built
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
