use core::fmt::Write;
use core::hint::black_box;

use crate::report::Reporter;
use crate::{assert_true, SuiteError};

pub fn run<W: Write>(r: &mut Reporter<W>) -> Result<(), SuiteError> {
    r.test_case("Modulo")?;

    let mut c: i16 = black_box(2);
    while c >= 0 {
        if (c % 5) == 0 {
            assert_true!(r, c != 1)?;
        }
        c -= 1;
    }
    Ok(())
}
