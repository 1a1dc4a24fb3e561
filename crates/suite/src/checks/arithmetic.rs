use core::fmt::Write;
use core::hint::black_box;

use crate::report::Reporter;
use crate::{assert_false, assert_false2, assert_true, SuiteError};

fn testzero(hm: i16) -> bool {
    hm > 0
}

pub fn run<W: Write>(r: &mut Reporter<W>) -> Result<(), SuiteError> {
    let a: i16 = black_box(1);
    let b: i16 = black_box(2);
    let c: i16 = black_box(4);
    r.test_case("Arithmetic Operations")?;

    assert_true!(r, (a << b) == 4)?;
    assert_true!(r, (c >> a) == 2)?;

    assert_false2!(r, "!(0 > 0)", black_box(0) > 0)?;
    assert_false!(r, a > b)?;

    assert_false2!(r, "!(testzero(0))", testzero(black_box(0)))?;
    Ok(())
}
