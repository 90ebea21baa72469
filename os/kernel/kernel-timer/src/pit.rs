//! # 8254 PIT, channel 2 one-shot
//!
//! Channel 2's gate and output are wired to system control port B (`0x61`)
//! rather than to an IRQ line, which makes it usable as a polled stopwatch:
//!
//! ```text
//! port 0x61   bit 0  gate of channel 2 (rising edge starts mode 0)
//!             bit 1  speaker data enable (kept off)
//!             bit 5  channel 2 output (goes high when the count expires)
//! ```

use crate::{ReferenceClock, TimerError};
use kernel_registers::ports::PortIo;

/// Input clock of the PIT.
pub const PIT_FREQUENCY: u32 = 1_193_180;

/// Longest one-shot the 16-bit counter can express.
pub const MAX_SLEEP_US: u32 = 54_000;

pub const CHANNEL2_DATA: u16 = 0x42;
pub const MODE_COMMAND: u16 = 0x43;
pub const PORT_B: u16 = 0x61;

/// Channel 2, lo/hi byte access, mode 0 (interrupt on terminal count).
pub const CHANNEL2_ONESHOT: u8 = 0b1011_0000;

const GATE: u8 = 1 << 0;
const SPEAKER: u8 = 1 << 1;
const OUTPUT: u8 = 1 << 5;

/// Counter reload value for a one-shot of `us` microseconds.
///
/// Saturates at `0xFFFF` for the few durations just below the limit whose
/// quotient exceeds 16 bits.
///
/// # Errors
/// [`TimerError::PitSleepOutOfRange`] for 0 or more than 54 ms.
#[allow(clippy::cast_possible_truncation)]
pub const fn divisor_for(us: u32) -> Result<u16, TimerError> {
    if us == 0 || us > MAX_SLEEP_US {
        return Err(TimerError::PitSleepOutOfRange(us));
    }
    let divisor = PIT_FREQUENCY / (1_000_000 / us);
    Ok(if divisor > 0xFFFF {
        u16::MAX
    } else {
        divisor as u16
    })
}

pub struct Pit<P: PortIo> {
    ports: P,
    divisor: u16,
}

impl<P: PortIo> Pit<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports, divisor: 0 }
    }

    /// Silences the speaker, puts channel 2 into one-shot mode and stores
    /// the divisor for [`sleep`](Self::sleep).
    ///
    /// # Errors
    /// See [`divisor_for`].
    pub fn prepare_sleep(&mut self, us: u32) -> Result<u16, TimerError> {
        let divisor = divisor_for(us)?;

        let b = self.ports.inb(PORT_B) & !SPEAKER;
        self.ports.outb(PORT_B, b);
        self.ports.outb(MODE_COMMAND, CHANNEL2_ONESHOT);

        self.divisor = divisor;
        Ok(divisor)
    }

    /// Loads the divisor, pulses the gate and spins until the output goes
    /// high.
    #[allow(clippy::cast_possible_truncation)]
    pub fn sleep(&mut self) {
        self.ports.outb(CHANNEL2_DATA, self.divisor as u8);
        self.ports.outb(CHANNEL2_DATA, (self.divisor >> 8) as u8);

        let b = self.ports.inb(PORT_B);
        self.ports.outb(PORT_B, b & !GATE);
        self.ports.outb(PORT_B, b | GATE);

        while self.ports.inb(PORT_B) & OUTPUT == 0 {
            core::hint::spin_loop();
        }
    }
}

impl<P: PortIo> ReferenceClock for Pit<P> {
    fn sleep_ms(&mut self, ms: u32) -> Result<(), TimerError> {
        const CHUNK_MS: u32 = MAX_SLEEP_US / 1000;
        let mut left = ms;
        while left > 0 {
            let chunk = left.min(CHUNK_MS);
            self.prepare_sleep(chunk * 1000)?;
            self.sleep();
            left -= chunk;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ports {
        port_b: Vec<u8>,
        writes: Vec<(u16, u8)>,
    }

    impl PortIo for Ports {
        fn inb(&mut self, port: u16) -> u8 {
            assert_eq!(port, PORT_B);
            if self.port_b.len() > 1 {
                self.port_b.remove(0)
            } else {
                self.port_b.first().copied().unwrap_or(0)
            }
        }

        fn outb(&mut self, port: u16, value: u8) {
            self.writes.push((port, value));
        }
    }

    #[test]
    fn divisors() {
        assert_eq!(divisor_for(10_000), Ok(11_931));
        assert_eq!(divisor_for(1_000), Ok(1_193));
        assert_eq!(divisor_for(54_000), Ok(u16::MAX));
        assert_eq!(divisor_for(0), Err(TimerError::PitSleepOutOfRange(0)));
        assert_eq!(
            divisor_for(54_001),
            Err(TimerError::PitSleepOutOfRange(54_001))
        );
    }

    #[test]
    fn one_shot_sequence() {
        let mut ports = Ports {
            // prepare, gate read, two polls low, then high
            port_b: vec![0b0000_0011, 0b0000_0001, 0, 0, OUTPUT],
            ..Ports::default()
        };
        let mut pit = Pit::new(&mut ports);
        assert_eq!(pit.prepare_sleep(10_000), Ok(11_931));
        pit.sleep();

        assert_eq!(
            ports.writes,
            vec![
                (PORT_B, 0b0000_0001),
                (MODE_COMMAND, 0xB0),
                (CHANNEL2_DATA, 0x9B),
                (CHANNEL2_DATA, 0x2E),
                (PORT_B, 0b0000_0000),
                (PORT_B, 0b0000_0001),
            ]
        );
        assert_eq!(ports.port_b, vec![OUTPUT]);
    }

    #[test]
    fn long_sleeps_are_chunked() {
        let mut ports = Ports {
            port_b: vec![OUTPUT],
            ..Ports::default()
        };
        Pit::new(&mut ports).sleep_ms(120).expect("in range");
        let modes = ports
            .writes
            .iter()
            .filter(|(p, _)| *p == MODE_COMMAND)
            .count();
        assert_eq!(modes, 3);
    }
}
