use core::fmt::Write;

use crate::report::Reporter;
use crate::{assert_true, SuiteError};

/// `int id(int first, ...)`: returns the first variadic argument, or `first`
/// when none were passed.
pub fn id(first: i16, rest: &[i16]) -> i16 {
    rest.first().copied().unwrap_or(first)
}

/// Variadic call site for [`id`].
#[macro_export]
macro_rules! id {
    ($first:expr $(, $arg:expr)* $(,)?) => {
        $crate::checks::functions::id($first, &[$($arg),*])
    };
}

pub fn run<W: Write>(r: &mut Reporter<W>) -> Result<(), SuiteError> {
    let mut slot: i16 = 0;
    let i = &mut slot as *mut i16;

    r.test_case("Functions")?;
    // SAFETY: `i` points at a live local for the whole function.
    unsafe { core::ptr::write_volatile(i, 47) };
    let i = unsafe { core::ptr::read_volatile(i) };

    assert_true!(r, i == 47)?;
    assert_true!(r, id!(0, 47) == 47)?;
    assert_true!(r, id!(0, i) == 47)?;
    Ok(())
}
