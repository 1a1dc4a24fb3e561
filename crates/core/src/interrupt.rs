use serde::Serialize;

/// Interrupt vectors of the simulated MSP430F1611 that have a modeled source.
///
/// Priority follows the vector address: the higher the address, the higher
/// the priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vector {
    Usart0Tx,
    Usart0Rx,
    TimerB1,
    TimerB0,
}

impl Vector {
    pub const ALL: [Vector; 4] = [
        Vector::Usart0Tx,
        Vector::Usart0Rx,
        Vector::TimerB1,
        Vector::TimerB0,
    ];

    /// Address of the vector table slot.
    pub const fn address(self) -> u16 {
        match self {
            Vector::Usart0Tx => 0xFFF0,
            Vector::Usart0Rx => 0xFFF2,
            Vector::TimerB1 => 0xFFF8,
            Vector::TimerB0 => 0xFFFA,
        }
    }

    pub const fn priority(self) -> u16 {
        (self.address() - 0xFFE0) / 2
    }

    pub const fn name(self) -> &'static str {
        match self {
            Vector::Usart0Tx => "UART0TX_VECTOR",
            Vector::Usart0Rx => "UART0RX_VECTOR",
            Vector::TimerB1 => "TIMERB1_VECTOR",
            Vector::TimerB0 => "TIMERB0_VECTOR",
        }
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
