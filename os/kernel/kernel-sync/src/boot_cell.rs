use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const SET: u8 = 2;

/// A global slot that is filled once during bring-up.
///
/// Readers observe either nothing or the fully written value. A second
/// [`set`](Self::set) is rejected and hands the value back.
pub struct BootCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for BootCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BootCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) == SET
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_set() {
            // SAFETY: SET is only published after the write completed.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Stores `value` if the cell is empty.
    ///
    /// # Errors
    /// Returns `value` back if the cell was already set (or being set).
    pub fn set(&self, value: T) -> Result<&T, T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        let slot = unsafe { (*self.value.get()).write(value) };
        self.state.store(SET, Ordering::Release);
        Ok(slot)
    }

    /// Initialize at most once and return `&T`.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(v) = self.get() {
            return v;
        }
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            unsafe { (*self.value.get()).write(init()) };
            self.state.store(SET, Ordering::Release);
        } else {
            while !self.is_set() {
                spin_loop();
            }
        }
        // SAFETY: SET observed (or published by us) above.
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<T> Drop for BootCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == SET {
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

// Safety: shared after SET; initialization is single-writer.
unsafe impl<T: Sync + Send> Sync for BootCell<T> {}
unsafe impl<T: Send> Send for BootCell<T> {}
