use core::fmt::Write;

use crate::hal::Cpu;
use crate::isr::TxCompletion;
use crate::regs::{self, Sfr1, Uctl, Utctl};
use crate::report::Reporter;
use crate::wait::WaitBudget;
use crate::{assert_true2, console, SuiteError};

/// Busy-loop iterations after the interrupt so the shift register drains.
pub const DRAIN_ITERATIONS: u32 = 10_000;

pub fn run<C, W>(
    cpu: &mut C,
    r: &mut Reporter<W>,
    tx: &TxCompletion,
    budget: WaitBudget,
) -> Result<(), SuiteError>
where
    C: Cpu + ?Sized,
    W: Write,
{
    r.test_case("Bit USART Operations")?;
    tx.reset();
    cpu.write_u8(regs::UCTL0, Uctl::CHAR.bits());
    cpu.write_u8(regs::UTCTL0, Utctl::SSEL1.bits());
    cpu.set_bits_u8(regs::ME1, (Sfr1::UTX0 | Sfr1::URX0).bits());
    cpu.set_bits_u8(regs::IE1, Sfr1::UTX0.bits());
    cpu.write_u8(regs::UTXBUF0, b'a');

    let outcome = budget.wait(cpu, |_| tx.fired(), |_, _| Ok::<_, SuiteError>(()))?;
    tracing::debug!(polls = outcome.polls(), irqs = tx.count(), "usart wait done");
    assert_true2!(r, "tx complete interrupt", outcome.is_satisfied())?;

    cpu.delay(DRAIN_ITERATIONS);
    console!(r, "output finished...\n")?;
    Ok(())
}
