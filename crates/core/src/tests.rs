#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use cputest_config::{BoardConfig, StopReason};
    use cputest_suite::regs::{self, Sfr1, Tbcctl, Tbctl, Uctl};
    use cputest_suite::{Cpu, Registers};

    use crate::bus::SystemBus;
    use crate::console::SerialConsole;
    use crate::interrupt::Vector;
    use crate::metrics::PerformanceMetrics;
    use crate::peripherals::port::Port;
    use crate::peripherals::usart::Usart;
    use crate::{Machine, SimulationError};

    fn board() -> Machine {
        let cfg = BoardConfig::default();
        let bus = SystemBus::msp430f1611(&cfg, SerialConsole::new(false));
        Machine::new(bus, &cfg)
    }

    #[test]
    fn test_unmapped_access_is_a_fault() {
        let mut machine = board();
        machine.write_u8(0x0300, 0xAA);
        assert_eq!(machine.read_u8(0x0300), 0);
        assert_eq!(
            machine.bus.faults(),
            &[
                SimulationError::MemoryViolation(0x0300),
                SimulationError::MemoryViolation(0x0300)
            ]
        );
    }

    #[test]
    fn test_p4in_is_read_only() {
        let mut machine = board();
        machine.write_u8(regs::P4IN, 1);
        assert_eq!(
            machine.bus.faults(),
            &[SimulationError::ReadOnly(regs::P4IN)]
        );
    }

    #[test]
    fn test_p4dir_write_reaches_port() {
        let mut machine = board();
        machine.write_u8(regs::P4DIR, 100);
        assert_eq!(machine.read_u8(regs::P4DIR), 100);
        let port = machine.bus.device::<Port>("port4").unwrap();
        assert_eq!(port.dir(), 100);
    }

    #[test]
    fn test_interrupts_wait_for_gie() {
        let mut machine = board();
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        machine.attach(Vector::Usart0Tx, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        machine.write_u8(regs::UCTL0, Uctl::CHAR.bits());
        machine.set_bits_u8(regs::IE1, Sfr1::UTX0.bits());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        machine.enable_interrupts();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(machine.interrupts_serviced(), 1);
        assert!(machine.gie());

        // UTXIFG0 was consumed by the accept.
        machine.advance(10);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(machine.read_u8(regs::IFG1) & Sfr1::UTX0.bits(), 0);
    }

    #[test]
    fn test_higher_vector_dispatches_first() {
        let mut machine = board();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        machine.attach(Vector::TimerB1, move |bus| {
            bus.read_u16(regs::TBIV);
            o.lock().unwrap().push(Vector::TimerB1);
        });
        let o = order.clone();
        machine.attach(Vector::Usart0Tx, move |_| {
            o.lock().unwrap().push(Vector::Usart0Tx);
        });

        machine.write_u16(regs::TBCTL, (Tbctl::TBSSEL1 | Tbctl::TBCLR).bits());
        machine.write_u16(regs::TBCCTL1, Tbcctl::CCIE.bits());
        machine.write_u16(regs::TBCCR1, 1);
        machine.set_bits_u16(regs::TBCTL, Tbctl::MC1.bits());
        machine.set_bits_u8(regs::IE1, Sfr1::UTX0.bits());
        machine.advance(2);

        machine.enable_interrupts();
        assert_eq!(
            *order.lock().unwrap(),
            vec![Vector::TimerB1, Vector::Usart0Tx]
        );
    }

    #[test]
    fn test_unhandled_interrupt_halts() {
        let mut machine = board();
        machine.enable_interrupts();
        machine.set_bits_u8(regs::IE1, Sfr1::UTX0.bits());
        assert!(machine.is_halted());
        assert_eq!(machine.stop_reason(), Some(StopReason::UnhandledInterrupt));

        let before = machine.cycles();
        machine.relax();
        assert_eq!(machine.cycles(), before);
    }

    #[test]
    fn test_max_cycles_halts() {
        let mut machine = board().with_max_cycles(100);
        machine.advance(1_000);
        assert_eq!(machine.cycles(), 100);
        assert_eq!(machine.stop_reason(), Some(StopReason::MaxCycles));
    }

    #[test]
    fn test_relax_and_delay_cost() {
        let mut machine = board();
        machine.relax();
        assert_eq!(machine.cycles(), 1_000);
        machine.delay(10);
        assert_eq!(machine.cycles(), 1_030);
    }

    #[test]
    fn test_usart_wire_shares_console() {
        let cfg = BoardConfig::default();
        let wire = SerialConsole::new(false);
        let bus = SystemBus::msp430f1611(&cfg, wire.clone());
        let mut machine = Machine::new(bus, &cfg);

        machine.write_u8(regs::UCTL0, Uctl::CHAR.bits());
        machine.write_u8(regs::UTCTL0, regs::Utctl::SSEL1.bits());
        machine.write_u8(regs::UBR00, 0x15);
        machine.set_bits_u8(regs::ME1, Sfr1::UTX0.bits());
        machine.write_u8(regs::UTXBUF0, b'a');
        machine.advance(500);

        assert_eq!(wire.text(), "a");
        let usart = machine.bus.device::<Usart>("usart0").unwrap();
        assert_eq!(usart.transmitted(), 1);
    }

    #[test]
    fn test_metrics_observer_counts() {
        let mut machine = board();
        let metrics = Arc::new(PerformanceMetrics::new());
        machine.observers.push(metrics.clone());

        machine.write_u8(regs::P4OUT, 1);
        machine.read_u8(regs::P4OUT);
        machine.advance(25);

        assert_eq!(metrics.get_cycles(), 25);
        assert_eq!(metrics.get_register_writes(), 1);
        assert_eq!(metrics.get_register_reads(), 1);
    }

    #[test]
    fn test_snapshot_lists_devices() {
        let mut machine = board();
        machine.write_u8(regs::P4DIR, 7);
        let snap = machine.snapshot();
        assert_eq!(snap.cycles, 0);
        assert!(snap.stop_reason.is_none());
        assert_eq!(snap.peripherals["port4"]["dir"], 7);
        assert!(snap.peripherals.contains_key("usart0"));
        assert!(snap.peripherals.contains_key("timer_b"));

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"gie\":false"));
    }
}
