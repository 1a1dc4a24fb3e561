use core::fmt::Write;

use crate::fmtbuf::FixedBuf;
use crate::report::Reporter;
use crate::{assert_true2, SuiteError};

pub fn run<W: Write>(r: &mut Reporter<W>) -> Result<(), SuiteError> {
    let mut buf = FixedBuf::<10>::new();

    r.test_case("String Operations")?;
    let written = buf.format(format_args!("test")).is_ok();
    assert_true2!(r, "test => test", written && buf == "test")?;
    let written = buf.format(format_args!("{}", 'a')).is_ok();
    assert_true2!(r, "buf == 'a'", written && buf == "a")?;
    Ok(())
}
