//! State shared between the interrupt handlers and the main flow.
//!
//! Each piece has exactly one writer (its ISR) and one reader (the polling
//! main loop). Only atomic loads and stores are used: the target has no
//! compare-and-swap, so read-modify-write is split into load + store, which is
//! sound with a single writer.

use core::fmt::Write;
use core::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

use crate::hal::Registers;
use crate::regs;

/// Number of timer-capture samples collected by the timer test.
pub const CAPTURE_SAMPLES: usize = 10;
/// Compare register advance per capture, in timer counts.
pub const CAPTURE_STEP: u16 = 100;

/// Timestamps recorded by the TIMERB1 handler.
#[derive(Debug)]
pub struct CaptureLog {
    pos: AtomicUsize,
    times: [AtomicU16; CAPTURE_SAMPLES],
}

impl Default for CaptureLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureLog {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU16 = AtomicU16::new(0);
        Self {
            pos: AtomicUsize::new(0),
            times: [ZERO; CAPTURE_SAMPLES],
        }
    }

    /// Main-flow side: restart collection. Call with interrupts disabled.
    pub fn reset(&self) {
        self.pos.store(0, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.pos.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= CAPTURE_SAMPLES
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        if index < self.len() {
            Some(self.times[index].load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Copies out the recorded samples; the second value is how many are valid.
    pub fn samples(&self) -> ([u16; CAPTURE_SAMPLES], usize) {
        let n = self.len().min(CAPTURE_SAMPLES);
        let mut out = [0u16; CAPTURE_SAMPLES];
        for (slot, t) in out.iter_mut().zip(self.times.iter()).take(n) {
            *slot = t.load(Ordering::Relaxed);
        }
        (out, n)
    }

    /// TIMERB1 vector body.
    pub fn on_timer_b1<R: Registers + ?Sized>(&self, board: &mut R) {
        // Reading TBIV acknowledges the highest pending source.
        if board.read_u16(regs::TBIV) != regs::TBIV_CCR1 {
            return;
        }
        let pos = self.pos.load(Ordering::Relaxed);
        if pos < CAPTURE_SAMPLES {
            let now = board.read_u16(regs::TBR);
            self.times[pos].store(now, Ordering::Relaxed);
            self.pos.store(pos + 1, Ordering::Release);
            let next = board.read_u16(regs::TBCCR1).wrapping_add(CAPTURE_STEP);
            board.write_u16(regs::TBCCR1, next);
            tracing::trace!(sample = pos, tbr = now, next, "timer capture");
        }
    }
}

/// Counter bumped by the USART0 TX handler. Zero means "not yet".
#[derive(Debug, Default)]
pub struct TxCompletion {
    count: AtomicU16,
}

impl TxCompletion {
    pub const fn new() -> Self {
        Self {
            count: AtomicU16::new(0),
        }
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }

    pub fn count(&self) -> u16 {
        self.count.load(Ordering::Acquire)
    }

    pub fn fired(&self) -> bool {
        self.count() != 0
    }

    /// USART0TX vector body. Console failures inside an interrupt have nowhere
    /// to go, so they are dropped.
    pub fn on_usart0_tx<R, W>(&self, board: &mut R, console: &mut W)
    where
        R: Registers + ?Sized,
        W: Write + ?Sized,
    {
        let ifg1 = board.read_u8(regs::IFG1);
        let utctl0 = board.read_u8(regs::UTCTL0);
        let _ = writeln!(console, "*IRQ: Flags:{} {}", ifg1, utctl0);
        let n = self.count.load(Ordering::Relaxed);
        self.count.store(n.wrapping_add(1), Ordering::Release);
    }
}
