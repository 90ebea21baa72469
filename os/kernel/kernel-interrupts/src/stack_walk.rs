//! # Frame-pointer stack walk
//!
//! With frame pointers enabled every frame starts with the caller's `rbp`
//! followed by the return address:
//!
//! ```text
//! rbp ──► [ saved rbp ] ──► [ saved rbp ] ──► ... ──► 0
//!         [ return rip ]    [ return rip ]
//! ```
//!
//! Fault handlers use this to print a best-effort backtrace before halting.

/// Depth limit of a fault backtrace.
pub const MAX_FRAMES: usize = 10;

/// One frame of the chain.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StackFrame {
    pub rbp: u64,
    pub rip: u64,
}

/// Iterator over a saved frame-pointer chain.
#[derive(Debug)]
pub struct FramePointerWalk {
    rbp: u64,
    remaining: usize,
}

impl FramePointerWalk {
    /// # Safety
    /// Every non-zero `rbp` reachable from `rbp` (up to `max_frames` links)
    /// must point at 16 readable bytes.
    #[must_use]
    pub const unsafe fn new(rbp: u64, max_frames: usize) -> Self {
        Self {
            rbp,
            remaining: max_frames,
        }
    }

    /// Walks from the caller's frame.
    ///
    /// # Safety
    /// The kernel must be built with frame pointers and the stack must be
    /// intact.
    #[cfg(feature = "asm")]
    #[must_use]
    #[inline(always)]
    pub unsafe fn from_current(max_frames: usize) -> Self {
        let rbp: u64;
        unsafe {
            core::arch::asm!("mov {}, rbp", out(reg) rbp, options(nomem, nostack, preserves_flags));
            Self::new(rbp, max_frames)
        }
    }
}

impl Iterator for FramePointerWalk {
    type Item = StackFrame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rbp == 0 || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let frame = self.rbp as *const u64;
        // SAFETY: guaranteed by the constructor's contract.
        let (saved_rbp, rip) = unsafe { (frame.read(), frame.add(1).read()) };
        let current = StackFrame { rbp: self.rbp, rip };
        self.rbp = saved_rbp;
        Some(current)
    }
}

impl core::iter::FusedIterator for FramePointerWalk {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a chain of `n` frames in host memory; the last saved rbp is 0.
    fn chain(n: usize) -> Vec<[u64; 2]> {
        let mut frames = vec![[0u64; 2]; n];
        let base = frames.as_ptr() as u64;
        for (i, f) in frames.iter_mut().enumerate() {
            f[0] = if i + 1 < n { base + 16 * (i as u64 + 1) } else { 0 };
            f[1] = 0x1000 + i as u64;
        }
        frames
    }

    #[test]
    fn stops_at_null_rbp() {
        let frames = chain(3);
        let walk = unsafe { FramePointerWalk::new(frames.as_ptr() as u64, MAX_FRAMES) };
        let rips: Vec<u64> = walk.map(|f| f.rip).collect();
        assert_eq!(rips, vec![0x1000, 0x1001, 0x1002]);
    }

    #[test]
    fn stops_at_depth_limit() {
        let frames = chain(25);
        let walk = unsafe { FramePointerWalk::new(frames.as_ptr() as u64, MAX_FRAMES) };
        assert_eq!(walk.count(), MAX_FRAMES);
    }

    #[test]
    fn null_start_is_empty() {
        let mut walk = unsafe { FramePointerWalk::new(0, MAX_FRAMES) };
        assert_eq!(walk.next(), None);
    }
}
