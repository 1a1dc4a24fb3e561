use crate::hal::Cpu;

/// Upper bound on busy-wait iterations.
///
/// `None` polls forever, which is what the hardware loop does; hosts and CI
/// runs set a budget so a lost interrupt shows up as a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitBudget {
    pub max_polls: Option<u32>,
}

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied { polls: u32 },
    Exhausted { polls: u32 },
    Halted { polls: u32 },
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }

    pub fn polls(&self) -> u32 {
        match *self {
            WaitOutcome::Satisfied { polls }
            | WaitOutcome::Exhausted { polls }
            | WaitOutcome::Halted { polls } => polls,
        }
    }
}

impl WaitBudget {
    pub const UNBOUNDED: Self = Self { max_polls: None };

    pub const fn polls(max_polls: u32) -> Self {
        Self {
            max_polls: Some(max_polls),
        }
    }

    /// Polls `done` until it holds. `on_poll` runs before every relax with the
    /// current poll count and may fail (console output), which aborts the wait.
    pub fn wait<C, E>(
        &self,
        cpu: &mut C,
        mut done: impl FnMut(&mut C) -> bool,
        mut on_poll: impl FnMut(&mut C, u32) -> Result<(), E>,
    ) -> Result<WaitOutcome, E>
    where
        C: Cpu + ?Sized,
    {
        let mut polls = 0u32;
        loop {
            if done(cpu) {
                return Ok(WaitOutcome::Satisfied { polls });
            }
            if cpu.is_halted() {
                tracing::warn!(polls, "cpu halted during busy-wait");
                return Ok(WaitOutcome::Halted { polls });
            }
            if let Some(max) = self.max_polls {
                if polls >= max {
                    tracing::warn!(polls, "busy-wait budget exhausted");
                    return Ok(WaitOutcome::Exhausted { polls });
                }
            }
            on_poll(cpu, polls)?;
            cpu.relax();
            polls = polls.saturating_add(1);
        }
    }
}
