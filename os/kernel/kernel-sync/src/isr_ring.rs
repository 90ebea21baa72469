use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Fixed-capacity byte queue between one interrupt handler (producer) and
/// the main loop (consumer).
///
/// The producer never blocks: when the ring is full the byte is dropped and
/// the overflow flag is raised. The consumer drains everything at once and
/// learns whether anything was lost since the previous drain.
///
/// Positions are free-running counters; `head - tail` is the fill level.
pub struct IsrRing<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    /// Next slot to write; only advanced by the producer.
    head: AtomicUsize,
    /// Next slot to read; only advanced by the consumer.
    tail: AtomicUsize,
    overflow: AtomicBool,
}

/// Result of [`IsrRing::drain_into`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Drained {
    /// Number of bytes copied out.
    pub count: usize,
    /// Bytes were dropped since the previous drain.
    pub overflowed: bool,
}

// Safety: single producer / single consumer; each slot is owned by exactly
// one side at a time as arbitrated by `head` and `tail`.
unsafe impl<const N: usize> Sync for IsrRing<N> {}

impl<const N: usize> Default for IsrRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> IsrRing<N> {
    const NON_EMPTY: () = assert!(N > 0, "ring capacity must be non-zero");

    #[must_use]
    pub const fn new() -> Self {
        let () = Self::NON_EMPTY;
        Self {
            buf: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overflow: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Producer side. Returns `false` if the byte was dropped.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= N {
            self.overflow.store(true, Ordering::Release);
            return false;
        }
        unsafe { self.buf.get().cast::<u8>().add(head % N).write_volatile(byte) };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Consumer side: take the oldest byte.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let byte = unsafe { self.buf.get().cast::<u8>().add(tail % N).read_volatile() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Consumer side: move up to `out.len()` bytes out, oldest first, and
    /// clear the overflow flag.
    pub fn drain_into(&self, out: &mut [u8]) -> Drained {
        let mut count = 0;
        while count < out.len() {
            match self.pop() {
                Some(b) => {
                    out[count] = b;
                    count += 1;
                }
                None => break,
            }
        }
        Drained {
            count,
            overflowed: self.overflow.swap(false, Ordering::AcqRel),
        }
    }
}
