//! Form state primitives shared by the view models.
//!
//! View models take `&self` in their actions so a caller can keep reading
//! their state while a submission is pending. Field values live in [`Slot`]s
//! whose lock is never held across an `.await`.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::errors::{BackendError, ValidationError};

/// One piece of form state behind a short-lived lock.
#[derive(Debug, Default)]
pub struct Slot<T>(Mutex<T>);

impl<T> Slot<T> {
    pub fn new(value: T) -> Self {
        Self(Mutex::new(value))
    }

    pub fn set(&self, value: T) {
        *self.lock() = value;
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn take(&self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> T {
        self.lock().clone()
    }
}

/// Result of submitting a post form.
///
/// Only `Done` means the backend accepted every step. `Failed` has already
/// been logged; the form keeps its input.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Every step succeeded; carries the post id.
    Done(String),
    /// Input failed validation; no backend call was issued.
    Rejected(ValidationError),
    /// A submission of the same form is still in flight.
    Busy,
    /// No identity is signed in.
    SignedOut,
    /// The signed-in identity does not own the post.
    NotOwner,
    /// A backend call failed part way.
    Failed(BackendError),
}

impl SubmitOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, SubmitOutcome::Done(_))
    }
}

/// Shared "submission in flight" flag of one form instance.
#[derive(Debug, Clone, Default)]
pub struct SubmitFlag(Arc<AtomicBool>);

impl SubmitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag unless it is already set.
    ///
    /// The returned guard clears the flag when dropped, so the flag is
    /// cleared on success, on failure, and on early return alike.
    pub fn try_begin(&self) -> Option<InFlight> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(self.0.clone()))
    }
}

#[derive(Debug)]
pub struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
