use core::fmt::Write;

use crate::bitfield::{Invert, Leds};
use crate::hal::Registers;
use crate::regs::{self, bv};
use crate::report::Reporter;
use crate::{assert_true, SuiteError};

/// `P4DIR |= BV(2) | BV(5) | BV(6)` must read back as 100.
fn test_bis<R, W>(board: &mut R, r: &mut Reporter<W>) -> Result<(), SuiteError>
where
    R: Registers + ?Sized,
    W: Write,
{
    board.set_bits_u8(regs::P4DIR, bv(2) | bv(5) | bv(6));
    let p4dir = board.read_u8(regs::P4DIR);
    assert_true!(r, p4dir == 100)?;
    Ok(())
}

pub fn run<R, W>(board: &mut R, r: &mut Reporter<W>) -> Result<(), SuiteError>
where
    R: Registers + ?Sized,
    W: Write,
{
    let mut leds = Leds::default();
    let mut invert = Invert::default();

    r.test_case("Bit field Operations")?;

    board.write_u8(regs::P4DIR, 0);
    test_bis(board, r)?;

    leds.set_green(1);
    leds.set_yellow(1);
    leds.set_red(1);

    assert_true!(r, leds.green() > 0)?;
    assert_true!(r, leds.yellow() > 0)?;
    assert_true!(r, leds.red() > 0)?;

    leds.set_green(leds.green().wrapping_sub(1));
    assert_true!(r, leds.green() == 0)?;

    invert.set_green(1);
    invert.set_yellow(1);
    invert.set_red(1);

    assert_true!(r, invert.green() > 0)?;
    assert_true!(r, invert.yellow() > 0)?;
    assert_true!(r, invert.red() > 0)?;

    invert.set_green(invert.green() ^ 1);
    assert_true!(r, invert.green() == 0)?;
    Ok(())
}
