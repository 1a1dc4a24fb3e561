use cputest_suite::regs::{self, Sfr1, Uctl, Utctl};

use crate::clock::{ClockSource, ClockTree, EdgeDivider};
use crate::console::SerialConsole;
use crate::interrupt::Vector;
use crate::peripherals::fifo::RxFifo;
use crate::{SimResult, SimulationError};

/// Device-local offset of the IE1..ME2 special function registers.
pub const SFR_OFFSET: u16 = 0x10;

/// USART0 in UART mode, including its bits in IE1/IFG1/ME1.
///
/// Transmitted characters go out on the wire after one character time;
/// UTXIFG0 and TXEPT are set when the stop bit has been sent. Received bytes
/// come from a host-fed [`RxFifo`].
#[derive(Debug, serde::Serialize)]
pub struct Usart {
    uctl: u8,
    utctl: u8,
    urctl: u8,
    umctl: u8,
    ubr0: u8,
    ubr1: u8,
    rxbuf: u8,
    ie1: u8,
    ifg1: u8,
    me1: u8,
    sfr2: [u8; 3],

    // Internal state
    shift: Option<u8>,
    pending: Option<u8>,
    remaining: u32,
    rx_full: bool,
    edges: EdgeDivider,
    rx_fifo: RxFifo,
    transmitted: u64,
    #[serde(skip)]
    wire: SerialConsole,
}

impl Usart {
    pub fn new(wire: SerialConsole, rx_depth: usize) -> Self {
        Self {
            uctl: Uctl::SWRST.bits(),
            utctl: Utctl::TXEPT.bits(),
            urctl: 0,
            umctl: 0,
            ubr0: 0,
            ubr1: 0,
            rxbuf: 0,
            ie1: 0,
            ifg1: Sfr1::UTX0.bits(),
            me1: 0,
            sfr2: [0; 3],
            shift: None,
            pending: None,
            remaining: 0,
            rx_full: false,
            edges: EdgeDivider::default(),
            rx_fifo: RxFifo::new(rx_depth),
            transmitted: 0,
            wire,
        }
    }

    /// Host side of the RX line. False when the FIFO is full.
    pub fn inject(&mut self, byte: u8) -> bool {
        let accepted = self.rx_fifo.push(byte);
        if !accepted {
            tracing::warn!(byte, "USART0 RX FIFO full; byte dropped");
        }
        accepted
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    pub fn rx_fifo(&self) -> &RxFifo {
        &self.rx_fifo
    }

    fn in_reset(&self) -> bool {
        Uctl::from_bits_retain(self.uctl).contains(Uctl::SWRST)
    }

    fn enabled(&self, bit: Sfr1) -> bool {
        !self.in_reset() && Sfr1::from_bits_retain(self.me1).contains(bit)
    }

    fn source(&self) -> ClockSource {
        match (self.utctl >> 4) & 0x3 {
            0 => ClockSource::External,
            1 => ClockSource::Aclk,
            _ => ClockSource::Smclk,
        }
    }

    /// Source-clock edges for one character frame.
    fn char_edges(&self) -> u32 {
        let divisor = (u16::from_le_bytes([self.ubr0, self.ubr1])).max(3) as u32;
        let ctl = Uctl::from_bits_retain(self.uctl);
        let data = if ctl.contains(Uctl::CHAR) { 8 } else { 7 };
        let parity = u32::from(ctl.contains(Uctl::PENA));
        let stop = if ctl.contains(Uctl::SPB) { 2 } else { 1 };
        divisor * (1 + data + parity + stop)
    }

    fn software_reset(&mut self) {
        self.shift = None;
        self.pending = None;
        self.remaining = 0;
        self.rx_full = false;
        self.utctl |= Utctl::TXEPT.bits();
        self.ifg1 |= Sfr1::UTX0.bits();
        self.ifg1 &= !Sfr1::URX0.bits();
    }

    fn start_tx(&mut self, byte: u8) {
        self.shift = Some(byte);
        self.remaining = self.char_edges();
        self.utctl &= !Utctl::TXEPT.bits();
    }

    fn load_txbuf(&mut self, byte: u8) {
        if !self.enabled(Sfr1::UTX0) {
            tracing::warn!(byte, "UTXBUF0 written while transmitter disabled; ignored");
            return;
        }
        self.ifg1 &= !Sfr1::UTX0.bits();
        if self.shift.is_none() {
            self.start_tx(byte);
        } else {
            self.pending = Some(byte);
        }
    }

    fn finish_tx(&mut self, byte: u8) {
        self.wire.push(byte);
        self.transmitted += 1;
        tracing::trace!(byte, "USART0 TX complete");
        match self.pending.take() {
            Some(next) => self.start_tx(next),
            None => {
                self.shift = None;
                self.utctl |= Utctl::TXEPT.bits();
                self.ifg1 |= Sfr1::UTX0.bits();
            }
        }
    }

    fn read_rxbuf(&mut self) -> u8 {
        self.rx_full = false;
        self.ifg1 &= !Sfr1::URX0.bits();
        self.rxbuf
    }

    fn peek(&self, offset: u16) -> u8 {
        match offset {
            0x00 => self.uctl,
            0x01 => self.utctl,
            0x02 => self.urctl,
            0x03 => self.umctl,
            0x04 => self.ubr0,
            0x05 => self.ubr1,
            0x06 => self.rxbuf,
            0x07 => self.shift.or(self.pending).unwrap_or(0),
            o if o == SFR_OFFSET => self.ie1,
            o if o == SFR_OFFSET + 2 => self.ifg1,
            o if o == SFR_OFFSET + 4 => self.me1,
            o if o == SFR_OFFSET + 1 || o == SFR_OFFSET + 3 || o == SFR_OFFSET + 5 => {
                self.sfr2[((o - SFR_OFFSET) / 2) as usize]
            }
            _ => 0,
        }
    }
}

impl crate::Peripheral for Usart {
    fn read(&mut self, offset: u16) -> SimResult<u8> {
        if offset == 0x06 {
            return Ok(self.read_rxbuf());
        }
        Ok(self.peek(offset))
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        match offset {
            0x00 => {
                let was_reset = self.in_reset();
                self.uctl = value;
                if self.in_reset() && !was_reset {
                    self.software_reset();
                }
                tracing::debug!("UCTL0 <= {:#04x}", value);
            }
            0x01 => {
                let txept = self.utctl & Utctl::TXEPT.bits();
                self.utctl = (value & !Utctl::TXEPT.bits()) | txept;
            }
            0x02 => self.urctl = value,
            0x03 => self.umctl = value,
            0x04 => self.ubr0 = value,
            0x05 => self.ubr1 = value,
            0x06 => return Err(SimulationError::ReadOnly(regs::URXBUF0)),
            0x07 => self.load_txbuf(value),
            o if o == SFR_OFFSET => self.ie1 = value,
            o if o == SFR_OFFSET + 2 => self.ifg1 = value,
            o if o == SFR_OFFSET + 4 => self.me1 = value,
            o if o == SFR_OFFSET + 1 || o == SFR_OFFSET + 3 || o == SFR_OFFSET + 5 => {
                self.sfr2[((o - SFR_OFFSET) / 2) as usize] = value;
            }
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self, clocks: &ClockTree) {
        if self.in_reset() {
            return;
        }

        if !self.rx_full && self.enabled(Sfr1::URX0) {
            if let Some(byte) = self.rx_fifo.pop() {
                self.rxbuf = byte;
                self.rx_full = true;
                self.ifg1 |= Sfr1::URX0.bits();
            }
        }

        let Some(byte) = self.shift else {
            return;
        };
        if !self.edges.step(clocks, self.source()) {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.finish_tx(byte);
        }
    }

    fn vectors(&self) -> &'static [Vector] {
        &[Vector::Usart0Tx, Vector::Usart0Rx]
    }

    fn irq_pending(&self, vector: Vector) -> bool {
        let bit = match vector {
            Vector::Usart0Tx => Sfr1::UTX0,
            Vector::Usart0Rx => Sfr1::URX0,
            _ => return false,
        };
        Sfr1::from_bits_retain(self.ie1 & self.ifg1).contains(bit)
    }

    fn acknowledge(&mut self, vector: Vector) {
        // UTXIFG0 resets when the interrupt is accepted; URXIFG0 on URXBUF0 read.
        if vector == Vector::Usart0Tx {
            self.ifg1 &= !Sfr1::UTX0.bits();
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{Usart, SFR_OFFSET};
    use crate::clock::ClockTree;
    use crate::console::SerialConsole;
    use crate::interrupt::Vector;
    use crate::Peripheral;
    use cputest_suite::regs::{Sfr1, Uctl, Utctl};

    const IE1: u16 = SFR_OFFSET;
    const IFG1: u16 = SFR_OFFSET + 2;
    const ME1: u16 = SFR_OFFSET + 4;

    fn configured(wire: &SerialConsole) -> Usart {
        let mut usart = Usart::new(wire.clone(), 4);
        usart.write(0x00, Uctl::CHAR.bits()).unwrap();
        usart.write(0x01, Utctl::SSEL1.bits()).unwrap();
        usart.write(0x04, 0x15).unwrap();
        usart.write(ME1, (Sfr1::UTX0 | Sfr1::URX0).bits()).unwrap();
        usart
    }

    fn run(usart: &mut Usart, cycles: usize) {
        let clocks = ClockTree::default();
        for _ in 0..cycles {
            usart.tick(&clocks);
        }
    }

    #[test]
    fn test_reset_state_reports_tx_ready() {
        let mut usart = Usart::new(SerialConsole::new(false), 4);
        assert_eq!(usart.read(0x00).unwrap(), Uctl::SWRST.bits());
        assert_eq!(usart.read(IFG1).unwrap(), Sfr1::UTX0.bits());
        assert_eq!(usart.read(0x01).unwrap() & Utctl::TXEPT.bits(), 1);
    }

    #[test]
    fn test_tx_takes_one_character_time() {
        let wire = SerialConsole::new(false);
        let mut usart = configured(&wire);
        usart.write(0x07, b'a').unwrap();
        assert_eq!(usart.read(IFG1).unwrap() & Sfr1::UTX0.bits(), 0);
        assert_eq!(usart.read(0x01).unwrap() & Utctl::TXEPT.bits(), 0);

        // 21 SMCLK edges per bit, 10 bits per frame.
        run(&mut usart, 209);
        assert!(wire.contents().is_empty());
        run(&mut usart, 1);
        assert_eq!(wire.contents(), b"a");
        assert_eq!(usart.transmitted(), 1);
        assert_ne!(usart.read(IFG1).unwrap() & Sfr1::UTX0.bits(), 0);
        assert_eq!(
            usart.read(0x01).unwrap(),
            (Utctl::SSEL1 | Utctl::TXEPT).bits()
        );
    }

    #[test]
    fn test_tx_interrupt_auto_clears_on_accept() {
        let wire = SerialConsole::new(false);
        let mut usart = configured(&wire);
        usart.write(IE1, Sfr1::UTX0.bits()).unwrap();
        assert!(usart.irq_pending(Vector::Usart0Tx));
        usart.acknowledge(Vector::Usart0Tx);
        assert!(!usart.irq_pending(Vector::Usart0Tx));
    }

    #[test]
    fn test_writes_ignored_while_transmitter_disabled() {
        let wire = SerialConsole::new(false);
        let mut usart = Usart::new(wire.clone(), 4);
        usart.write(0x07, b'x').unwrap();
        run(&mut usart, 10_000);
        assert!(wire.contents().is_empty());
    }

    #[test]
    fn test_back_to_back_bytes_are_queued() {
        let wire = SerialConsole::new(false);
        let mut usart = configured(&wire);
        usart.write(0x07, b'o').unwrap();
        usart.write(0x07, b'k').unwrap();
        run(&mut usart, 420);
        assert_eq!(wire.contents(), b"ok");
    }

    #[test]
    fn test_rx_fifo_feeds_urxbuf() {
        let mut usart = configured(&SerialConsole::new(false));
        usart.write(IE1, Sfr1::URX0.bits()).unwrap();
        assert!(usart.inject(b'h'));
        assert!(usart.inject(b'i'));

        run(&mut usart, 1);
        assert!(usart.irq_pending(Vector::Usart0Rx));
        assert_eq!(usart.read(0x06).unwrap(), b'h');
        assert!(!usart.irq_pending(Vector::Usart0Rx));

        run(&mut usart, 1);
        assert_eq!(usart.read(0x06).unwrap(), b'i');
        assert!(usart.rx_fifo().is_empty());
    }

    #[test]
    fn test_rx_fifo_refuses_when_full() {
        let mut usart = Usart::new(SerialConsole::new(false), 2);
        assert!(usart.inject(1));
        assert!(usart.inject(2));
        assert!(!usart.inject(3));
        assert_eq!(usart.rx_fifo().dropped(), 1);
    }
}
