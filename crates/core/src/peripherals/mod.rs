pub mod fifo;
pub mod port;
pub mod timer_b;
pub mod usart;
