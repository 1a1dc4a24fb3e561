use core::fmt::Write;
use core::hint::black_box;

use crate::report::Reporter;
use crate::{assert_true, SuiteError};

#[allow(clippy::float_cmp)]
pub fn run<W: Write>(r: &mut Reporter<W>) -> Result<(), SuiteError> {
    let mut i: i16 = black_box(2);
    let f: f32 = black_box(0.5);
    r.test_case("Float Operations")?;
    assert_true!(r, (i as f32 * f) == 1.0)?;
    i += 1;
    assert_true!(r, (i as f32 * f) == 1.5)?;
    Ok(())
}
