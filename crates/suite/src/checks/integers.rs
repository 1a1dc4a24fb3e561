use core::fmt::Write;
use core::hint::black_box;

use crate::report::Reporter;
use crate::{assert_false, assert_true, SuiteError};

pub fn run<W: Write>(r: &mut Reporter<W>) -> Result<(), SuiteError> {
    r.test_case("Integer Operations")?;
    let mut a: i16 = black_box(1);
    let mut b: i16 = black_box(2);
    let c: i16 = black_box(-42);
    let t: [i16; 3] = black_box([1, 2, 3]);

    assert_true!(r, a == 1)?;
    assert_true!(r, (b + c) == -40)?;
    assert_true!(r, t[0] == 1)?;
    assert_true!(r, t[1] == 2)?;
    assert_true!(r, t[t[0] as usize] == 2)?;
    assert_true!(r, (a + b) == 3)?;
    assert_true!(r, (b - a) == 1)?;
    assert_true!(r, (a - b) == -1)?;
    assert_true!(r, (a * b) == 2)?;
    assert_true!(r, a > 0)?;
    assert_true!(r, b > a)?;
    assert_true!(r, b != a)?;
    assert_true!(r, (a ^ b) == 3)?;
    assert_true!(r, (a ^ 4) == 5)?;
    assert_true!(r, (a ^ a) == 0)?;
    assert_false!(r, a > b)?;

    a = black_box(15);
    b = black_box(17);
    assert_true!(r, (a & !b) == 14)?;
    Ok(())
}
