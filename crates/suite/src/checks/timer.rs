use core::fmt::Write;

use crate::hal::Cpu;
use crate::isr::{CaptureLog, CAPTURE_STEP};
use crate::regs::{self, Tbcctl, Tbctl};
use crate::report::Reporter;
use crate::wait::WaitBudget;
use crate::{assert_true2, console, SuiteError};

pub fn run<C, W>(
    cpu: &mut C,
    r: &mut Reporter<W>,
    log: &CaptureLog,
    budget: WaitBudget,
) -> Result<(), SuiteError>
where
    C: Cpu + ?Sized,
    W: Write,
{
    r.test_case("Timer Capture")?;
    cpu.disable_interrupts();
    log.reset();
    // ACLK, cleared, divide by 1.
    cpu.write_u16(
        regs::TBCTL,
        (Tbctl::TBSSEL0 | Tbctl::TBCLR | Tbctl::ID_0).bits(),
    );
    // Interrupt when TBR reaches TBCCR1.
    cpu.write_u16(regs::TBCCTL1, Tbcctl::CCIE.bits());
    // Continuous mode.
    cpu.set_bits_u16(regs::TBCTL, Tbctl::MC1.bits());

    cpu.write_u16(regs::TBR, 0);
    cpu.write_u16(regs::TBCCR1, CAPTURE_STEP);

    cpu.enable_interrupts();

    let outcome = budget.wait(
        cpu,
        |_| log.is_full(),
        |_, _| console!(r, "waiting for timer...{}\n", log.len()),
    )?;
    tracing::debug!(polls = outcome.polls(), samples = log.len(), "timer wait done");
    assert_true2!(r, "timer capture complete", outcome.is_satisfied())?;

    let (times, n) = log.samples();
    for (i, t) in times[..n].iter().enumerate() {
        console!(r, "Trigg time {} => {}\n", i + 1, t)?;
    }
    Ok(())
}
