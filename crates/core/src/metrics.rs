use crate::interrupt::Vector;
use crate::SimulationObserver;
use cputest_config::StopReason;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct PerformanceMetrics {
    cycle_count: AtomicU64,
    interrupt_count: AtomicU64,
    register_reads: AtomicU64,
    register_writes: AtomicU64,
    start_time: Instant,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            cycle_count: AtomicU64::new(0),
            interrupt_count: AtomicU64::new(0),
            register_reads: AtomicU64::new(0),
            register_writes: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.cycle_count.store(0, Ordering::SeqCst);
        self.interrupt_count.store(0, Ordering::SeqCst);
        self.register_reads.store(0, Ordering::SeqCst);
        self.register_writes.store(0, Ordering::SeqCst);
    }

    pub fn get_cycles(&self) -> u64 {
        self.cycle_count.load(Ordering::SeqCst)
    }

    pub fn get_interrupts(&self) -> u64 {
        self.interrupt_count.load(Ordering::SeqCst)
    }

    pub fn get_register_reads(&self) -> u64 {
        self.register_reads.load(Ordering::SeqCst)
    }

    pub fn get_register_writes(&self) -> u64 {
        self.register_writes.load(Ordering::SeqCst)
    }

    /// Simulated cycles per host second.
    pub fn get_cps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_cycles() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_simulation_stop(&self, reason: StopReason) {
        tracing::debug!(
            ?reason,
            cycles = self.get_cycles(),
            interrupts = self.get_interrupts(),
            "metrics at stop"
        );
    }

    fn on_cycles(&self, cycles: u64) {
        self.cycle_count.fetch_add(cycles, Ordering::SeqCst);
    }

    fn on_interrupt(&self, _vector: Vector) {
        self.interrupt_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_register_access(&self, _addr: u16, write: bool) {
        if write {
            self.register_writes.fetch_add(1, Ordering::SeqCst);
        } else {
            self.register_reads.fetch_add(1, Ordering::SeqCst);
        }
    }
}
