//! The check groups, one module per test case, in run order.

pub mod arithmetic;
pub mod bitfields;
pub mod floats;
pub mod functions;
pub mod integers;
pub mod modulo;
pub mod strings;
pub mod timer;
pub mod usart;
