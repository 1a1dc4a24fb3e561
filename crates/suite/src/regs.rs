//! Register map of the MSP430F1611 peripherals the suite touches.
//!
//! Addresses are 16-bit; byte registers live below 0x100, word registers
//! above. Bit sets are `bitflags` so read-modify-write sites stay readable.

use bitflags::bitflags;

/// Special function registers.
pub const IE1: u16 = 0x0000;
pub const IFG1: u16 = 0x0002;
pub const ME1: u16 = 0x0004;

/// Port 4.
pub const P4IN: u16 = 0x001C;
pub const P4OUT: u16 = 0x001D;
pub const P4DIR: u16 = 0x001E;
pub const P4SEL: u16 = 0x001F;

/// USART0 (UART mode).
pub const UCTL0: u16 = 0x0070;
pub const UTCTL0: u16 = 0x0071;
pub const URCTL0: u16 = 0x0072;
pub const UMCTL0: u16 = 0x0073;
pub const UBR00: u16 = 0x0074;
pub const UBR10: u16 = 0x0075;
pub const URXBUF0: u16 = 0x0076;
pub const UTXBUF0: u16 = 0x0077;

/// Timer_B7 (only three capture/compare blocks are wired up).
pub const TBIV: u16 = 0x011E;
pub const TBCTL: u16 = 0x0180;
pub const TBCCTL0: u16 = 0x0182;
pub const TBCCTL1: u16 = 0x0184;
pub const TBCCTL2: u16 = 0x0186;
pub const TBR: u16 = 0x0190;
pub const TBCCR0: u16 = 0x0192;
pub const TBCCR1: u16 = 0x0194;
pub const TBCCR2: u16 = 0x0196;

/// TBIV value reported for a pending CCR1 compare.
pub const TBIV_CCR1: u16 = 0x02;
pub const TBIV_CCR2: u16 = 0x04;
pub const TBIV_TBIFG: u16 = 0x0E;

/// `BV(n)` from the C headers.
pub const fn bv(n: u8) -> u8 {
    1 << n
}

bitflags! {
    /// IE1 / IFG1 / ME1 bits owned by USART0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sfr1: u8 {
        const URX0 = 1 << 6;
        const UTX0 = 1 << 7;
    }
}

bitflags! {
    /// USART control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Uctl: u8 {
        const SWRST = 1 << 0;
        const MM = 1 << 1;
        const SYNC = 1 << 2;
        const LISTEN = 1 << 3;
        /// 8-bit characters when set, 7-bit otherwise.
        const CHAR = 1 << 4;
        const SPB = 1 << 5;
        const PEV = 1 << 6;
        const PENA = 1 << 7;
    }
}

bitflags! {
    /// USART transmit control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Utctl: u8 {
        /// Transmitter empty.
        const TXEPT = 1 << 0;
        const STC = 1 << 1;
        const TXWAKE = 1 << 2;
        const URXSE = 1 << 3;
        const SSEL0 = 1 << 4;
        const SSEL1 = 1 << 5;
        const CKPL = 1 << 6;
    }
}

bitflags! {
    /// Timer_B control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Tbctl: u16 {
        const TBIFG = 1 << 0;
        const TBIE = 1 << 1;
        const TBCLR = 1 << 2;
        const MC0 = 1 << 4;
        const MC1 = 1 << 5;
        const ID0 = 1 << 6;
        const ID1 = 1 << 7;
        const TBSSEL0 = 1 << 8;
        const TBSSEL1 = 1 << 9;
        const CNTL0 = 1 << 11;
        const CNTL1 = 1 << 12;
        const TBCLGRP0 = 1 << 13;
        const TBCLGRP1 = 1 << 14;
    }
}

impl Tbctl {
    /// Input divider /1.
    pub const ID_0: Self = Self::empty();
    pub const MC_MASK: Self = Self::MC0.union(Self::MC1);
    pub const ID_MASK: Self = Self::ID0.union(Self::ID1);
    pub const TBSSEL_MASK: Self = Self::TBSSEL0.union(Self::TBSSEL1);
    pub const CNTL_MASK: Self = Self::CNTL0.union(Self::CNTL1);
}

bitflags! {
    /// Timer_B capture/compare control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Tbcctl: u16 {
        const CCIFG = 1 << 0;
        const COV = 1 << 1;
        const OUT = 1 << 2;
        const CCI = 1 << 3;
        const CCIE = 1 << 4;
        const CAP = 1 << 8;
    }
}
