use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::cpu::core::Handler;
use crate::signals::{BreakReason, Signals, SlowPath};

#[path = "addressing_tests.rs"]
mod addressing_mode_tests;

#[path = "dispatch_tests.rs"]
mod dispatch_tests;

struct TestBus {
    memory: Vec<u8>,
    accesses: u64,
    writes: Vec<(u32, u8)>,
    bad_read: Option<u32>,
}

impl TestBus {
    fn new() -> Self {
        Self {
            memory: vec![0; 1 << 24],
            accesses: 0,
            writes: Vec::new(),
            bad_read: None,
        }
    }

    fn load_program(&mut self, program: &[u8], start_addr: u32) {
        for (i, &byte) in program.iter().enumerate() {
            self.memory[start_addr as usize + i] = byte;
        }
    }

    fn poke(&mut self, addr: u32, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn mem(&self, addr: u32) -> u8 {
        self.memory[addr as usize]
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u32, signals: &mut Signals) -> u8 {
        self.accesses += 1;
        if self.bad_read == Some(addr) {
            signals.raise(BreakReason::BadRead, format!("unmapped read at {:06X}", addr));
        }
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u32, data: u8, _signals: &mut Signals) {
        self.accesses += 1;
        self.writes.push((addr, data));
        self.memory[addr as usize] = data;
    }

    fn peek(&self, addr: u32) -> u8 {
        self.memory[addr as usize]
    }
}

#[derive(Default)]
struct TestClock {
    ticks: u64,
}

impl Clock for TestClock {
    fn tick_master(&mut self, clocks: u64) {
        self.ticks += clocks;
    }

    fn tick_cpu_n(&mut self, cycles: u32) {
        self.ticks += cycles as u64;
    }
}

/// Sparse bus for randomized runs. Untouched memory reads as a hash of the
/// address, and every access is logged in order.
#[derive(Clone)]
struct RecordingBus {
    seed: u32,
    written: HashMap<u32, u8>,
    log: Vec<(bool, u32, u8)>,
}

impl RecordingBus {
    fn new(seed: u32) -> Self {
        Self {
            seed,
            written: HashMap::new(),
            log: Vec::new(),
        }
    }

    fn background(&self, addr: u32) -> u8 {
        let h = (addr ^ self.seed.rotate_left(11)).wrapping_mul(0x9e37_79b1);
        (h >> 24) as u8
    }
}

impl Bus for RecordingBus {
    fn read(&mut self, addr: u32, _signals: &mut Signals) -> u8 {
        let value = self.peek(addr);
        self.log.push((false, addr, value));
        value
    }

    fn write(&mut self, addr: u32, data: u8, _signals: &mut Signals) {
        self.written.insert(addr, data);
        self.log.push((true, addr, data));
    }

    fn peek(&self, addr: u32) -> u8 {
        match self.written.get(&addr) {
            Some(&value) => value,
            None => self.background(addr),
        }
    }
}

/// Random register file that is consistent with `mode`.
fn random_state(rng: &mut StdRng, mode: Mode) -> State {
    let mut state = State::new();
    state.a = rng.random();
    state.x = rng.random();
    state.y = rng.random();
    state.s = rng.random();
    state.d = rng.random();
    state.pc = rng.random();
    state.k = (rng.random::<u8>() as u32) << 16;
    state.dbr = (rng.random::<u8>() as u32) << 16;
    state.p = StatusFlags::from_bits_retain(rng.random());
    if mode != Mode::Emulation {
        state.p.set(StatusFlags::MEMORY_8BIT, !mode.acc16());
        state.p.set(StatusFlags::INDEX_8BIT, !mode.idx16());
    }
    state.enter_mode(mode);
    state
}

/// Run one compiled handler (opcode already fetched) on a copy of `state`.
fn execute(handler: Handler, state: &State, seed: u32) -> (State, RecordingBus, u64) {
    let mut state = state.clone();
    let mut bus = RecordingBus::new(seed);
    let mut clock = TestClock::default();
    handler(&mut state, &mut bus, &mut clock);
    (state, bus, clock.ticks)
}

fn to_bcd(n: u16) -> u16 {
    ((n / 10) << 4) | (n % 10)
}

fn setup_cpu() -> (Cpu, TestBus, TestClock) {
    let cpu = Cpu::new();
    let mut bus = TestBus::new();
    // Set reset vector
    bus.poke(0xfffc, 0x00);
    bus.poke(0xfffd, 0x80);
    (cpu, bus, TestClock::default())
}

/// Run one instruction and return the cycles it took (bus accesses plus
/// internal operations).
fn step(cpu: &mut Cpu, bus: &mut TestBus, clock: &mut TestClock) -> u64 {
    let before = bus.accesses + clock.ticks;
    cpu.run(bus, clock, 1);
    bus.accesses + clock.ticks - before
}

fn set_native(cpu: &mut Cpu, mode: Mode) {
    cpu.state.p.set(StatusFlags::MEMORY_8BIT, !mode.acc16());
    cpu.state.p.set(StatusFlags::INDEX_8BIT, !mode.idx16());
    cpu.state.enter_mode(mode);
}

#[test]
fn test_reset() {
    let (mut cpu, mut bus, _) = setup_cpu();
    bus.poke(0xfffc, 0x34);
    bus.poke(0xfffd, 0x82);

    let reason = cpu.reset(&mut bus);

    assert_eq!(reason, BreakReason::None);
    assert_eq!(cpu.state.pc, 0x8234);
    assert_eq!(cpu.state.s, 0x0100);
    assert_eq!(cpu.state.mode, Mode::Emulation);
    assert_eq!(
        cpu.state.p,
        StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT | StatusFlags::IRQ_DISABLE
    );
}

#[test]
fn test_lda_immediate() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // LDA #$42
    bus.load_program(&[0xa9, 0x42], 0x8000);

    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.a, 0x42);
    assert_eq!(cpu.state.pc, 0x8002);
    assert_eq!(cycles, 2);
    assert!(!cpu.state.flag(StatusFlags::ZERO));
    assert!(!cpu.state.flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_lda_flags() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // LDA #$00; LDA #$80
    bus.load_program(&[0xa9, 0x00, 0xa9, 0x80], 0x8000);

    step(&mut cpu, &mut bus, &mut clock);
    assert!(cpu.state.flag(StatusFlags::ZERO));
    assert!(!cpu.state.flag(StatusFlags::NEGATIVE));

    step(&mut cpu, &mut bus, &mut clock);
    assert!(!cpu.state.flag(StatusFlags::ZERO));
    assert!(cpu.state.flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_lda_immediate_16bit() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M16X16);

    // LDA #$8001
    bus.load_program(&[0xa9, 0x01, 0x80], 0x8000);

    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.a, 0x8001);
    assert_eq!(cpu.state.pc, 0x8003);
    assert_eq!(cycles, 3);
    assert!(cpu.state.flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_sep_narrows_following_immediate() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M16X16);
    cpu.state.a = 0xab00;

    // SEP #$20; LDA #$12
    bus.load_program(&[0xe2, 0x20, 0xa9, 0x12], 0x8000);

    let executed = cpu.run(&mut bus, &mut clock, 2);

    assert_eq!(executed, 2);
    assert_eq!(cpu.state.mode, Mode::M8X16);
    assert_eq!(cpu.state.pc, 0x8004);
    // The hidden high byte survives 8-bit loads.
    assert_eq!(cpu.state.a, 0xab12);
}

#[test]
fn test_rep_widens_following_immediate() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // CLC; XCE; REP #$30; LDA #$1234
    bus.load_program(&[0x18, 0xfb, 0xc2, 0x30, 0xa9, 0x34, 0x12], 0x8000);

    let executed = cpu.run(&mut bus, &mut clock, 4);

    assert_eq!(executed, 4);
    assert_eq!(cpu.state.mode, Mode::M16X16);
    assert_eq!(cpu.state.a, 0x1234);
    assert_eq!(cpu.state.pc, 0x8007);
}

#[test]
fn test_mode_change_sets_slow_path() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);

    // REP #$10
    bus.load_program(&[0xc2, 0x10], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.mode, Mode::M8X16);
    assert!(cpu.state.signals.slow_path.contains(SlowPath::MODE_CHANGE));
    assert!(!cpu.state.signals.is_break());
}

#[test]
fn test_sep_truncates_index_registers() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M16X16);
    cpu.state.x = 0x1234;
    cpu.state.y = 0xabcd;

    // SEP #$10
    bus.load_program(&[0xe2, 0x10], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cycles, 3);
    assert_eq!(cpu.state.mode, Mode::M16X8);
    assert_eq!(cpu.state.x, 0x34);
    assert_eq!(cpu.state.y, 0xcd);
}

#[test]
fn test_rep_cannot_clear_width_bits_in_emulation() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // REP #$30
    bus.load_program(&[0xc2, 0x30], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.mode, Mode::Emulation);
    assert!(cpu.state.flag(StatusFlags::MEMORY_8BIT));
    assert!(cpu.state.flag(StatusFlags::INDEX_8BIT));
}

#[test]
fn test_xce_enters_native_mode() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // CLC; XCE
    bus.load_program(&[0x18, 0xfb], 0x8000);
    cpu.run(&mut bus, &mut clock, 2);

    assert_eq!(cpu.state.mode, Mode::M8X8);
    // Carry receives the old emulation bit.
    assert!(cpu.state.flag(StatusFlags::CARRY));
    assert!(cpu.state.signals.slow_path.contains(SlowPath::MODE_CHANGE));
}

#[test]
fn test_xce_returns_to_emulation() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // CLC; XCE; REP #$30; LDX #$1234; LDY #$5678; LDA #$02FF; TCS; SEC; XCE
    bus.load_program(
        &[
            0x18, 0xfb, 0xc2, 0x30, 0xa2, 0x34, 0x12, 0xa0, 0x78, 0x56, 0xa9, 0xff, 0x02, 0x1b,
            0x38, 0xfb,
        ],
        0x8000,
    );
    let executed = cpu.run(&mut bus, &mut clock, 9);

    assert_eq!(executed, 9);
    assert_eq!(cpu.state.mode, Mode::Emulation);
    assert_eq!(cpu.state.x, 0x34);
    assert_eq!(cpu.state.y, 0x78);
    assert_eq!(cpu.state.s, 0x01ff);
    assert!(!cpu.state.flag(StatusFlags::CARRY));
    assert!(cpu.state.flag(StatusFlags::MEMORY_8BIT));
    assert!(cpu.state.flag(StatusFlags::INDEX_8BIT));
}

#[test]
fn test_xce_without_change() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // SEC; XCE
    bus.load_program(&[0x38, 0xfb], 0x8000);
    cpu.run(&mut bus, &mut clock, 2);

    assert_eq!(cpu.state.mode, Mode::Emulation);
    assert!(cpu.state.flag(StatusFlags::CARRY));
}

#[test]
fn test_jsr_pushes_return_address() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // JSR $1234
    bus.load_program(&[0x20, 0x34, 0x12], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc, 0x1234);
    assert_eq!(cycles, 6);
    // Address of the last byte of JSR, high byte first; S wraps in page 1.
    assert_eq!(bus.mem(0x0100), 0x80);
    assert_eq!(bus.mem(0x01ff), 0x02);
    assert_eq!(cpu.state.s, 0x01fe);
}

#[test]
fn test_jsr_rts_round_trip() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.s = 0x01ff;

    // JSR $9000 / $9000: RTS
    bus.load_program(&[0x20, 0x00, 0x90], 0x8000);
    bus.load_program(&[0x60], 0x9000);

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x9000);

    let cycles = step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x8003);
    assert_eq!(cpu.state.s, 0x01ff);
    assert_eq!(cycles, 6);
}

#[test]
fn test_jsl_rtl_round_trip() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.s = 0x1fff;

    // JSL $018000 / $018000: RTL
    bus.load_program(&[0x22, 0x00, 0x80, 0x01], 0x8000);
    bus.load_program(&[0x6b], 0x01_8000);

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc24(), 0x01_8000);
    assert_eq!(bus.mem(0x1fff), 0x00);
    assert_eq!(bus.mem(0x1ffe), 0x80);
    assert_eq!(bus.mem(0x1ffd), 0x03);

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc24(), 0x00_8004);
    assert_eq!(cpu.state.s, 0x1fff);
}

#[test]
fn test_adc_binary_overflow() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // CLC; LDA #$7F; ADC #$01
    bus.load_program(&[0x18, 0xa9, 0x7f, 0x69, 0x01], 0x8000);
    cpu.run(&mut bus, &mut clock, 3);

    assert_eq!(cpu.state.a & 0xff, 0x80);
    assert!(cpu.state.flag(StatusFlags::OVERFLOW));
    assert!(cpu.state.flag(StatusFlags::NEGATIVE));
    assert!(!cpu.state.flag(StatusFlags::CARRY));
}

#[test]
fn test_decimal_adc_sbc() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // SED; CLC; LDA #$19; ADC #$28; SEC; SBC #$09
    bus.load_program(
        &[0xf8, 0x18, 0xa9, 0x19, 0x69, 0x28, 0x38, 0xe9, 0x09],
        0x8000,
    );

    cpu.run(&mut bus, &mut clock, 4);
    assert_eq!(cpu.state.a & 0xff, 0x47);
    assert!(!cpu.state.flag(StatusFlags::CARRY));

    cpu.run(&mut bus, &mut clock, 2);
    assert_eq!(cpu.state.a & 0xff, 0x38);
    assert!(cpu.state.flag(StatusFlags::CARRY));
}

#[test]
fn test_decimal_adc_16bit_carries_across_digits() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M16X16);
    cpu.state.a = 0x1999;
    cpu.state.p.insert(StatusFlags::DECIMAL);

    // ADC #$0001
    bus.load_program(&[0x69, 0x01, 0x00], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.a, 0x2000);
    assert!(!cpu.state.flag(StatusFlags::CARRY));
}

#[test]
fn test_decimal_sbc_borrow() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.a = 0x10;
    cpu.state.p.insert(StatusFlags::DECIMAL | StatusFlags::CARRY);

    // SBC #$20
    bus.load_program(&[0xe9, 0x20], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.a & 0xff, 0x90);
    assert!(!cpu.state.flag(StatusFlags::CARRY));
}

#[test]
fn test_decimal_round_trip_all_digit_pairs() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    for b in 0..100 {
        // ADC #b; SBC #b
        bus.load_program(&[0x69, to_bcd(b) as u8, 0xe9, to_bcd(b) as u8], 0x8000);

        for a in 0..100 {
            for carry in [false, true] {
                cpu.state.pc = 0x8000;
                cpu.state.a = to_bcd(a);
                cpu.state.p.insert(StatusFlags::DECIMAL);
                cpu.state.p.set(StatusFlags::CARRY, carry);

                step(&mut cpu, &mut bus, &mut clock);
                let sum = a + b + carry as u16;
                assert_eq!(cpu.state.a & 0xff, to_bcd(sum % 100), "{a} + {b} + {carry}");
                assert_eq!(cpu.state.flag(StatusFlags::CARRY), sum >= 100);

                cpu.state.p.set(StatusFlags::CARRY, !carry);
                step(&mut cpu, &mut bus, &mut clock);
                assert_eq!(cpu.state.a & 0xff, to_bcd(a), "{a} + {b} - {b}, carry {carry}");
            }
        }
    }
}

#[test]
fn test_index_stays_8bit_for_every_opcode() {
    let cpu = Cpu::new();
    let mut rng = StdRng::seed_from_u64(0x65816);

    for mode in [Mode::M16X8, Mode::M8X8, Mode::Emulation] {
        for opcode in 0..=255u8 {
            let handler = cpu.dispatcher().handler(mode, opcode);
            for _ in 0..16 {
                let state = random_state(&mut rng, mode);
                let (after, _, _) = execute(handler, &state, rng.random());

                assert!(
                    after.x <= 0xff && after.y <= 0xff,
                    "opcode {:02X} in {}: X={:04X} Y={:04X}",
                    opcode,
                    mode,
                    after.x,
                    after.y
                );
            }
        }
    }
}

#[test]
fn test_emulation_stack_stays_in_page_one_for_every_opcode() {
    let cpu = Cpu::new();
    let mut rng = StdRng::seed_from_u64(0x0100);

    for opcode in 0..=255u8 {
        let handler = cpu.dispatcher().handler(Mode::Emulation, opcode);
        for _ in 0..32 {
            let state = random_state(&mut rng, Mode::Emulation);
            let (after, _, _) = execute(handler, &state, rng.random());

            // XCE may leave emulation mode, after which S is unconstrained.
            if after.mode == Mode::Emulation {
                assert!(
                    (0x0100..=0x01ff).contains(&after.s),
                    "opcode {:02X}: S={:04X}",
                    opcode,
                    after.s
                );
            }
        }
    }
}

#[test]
fn test_cmp_sets_carry_and_zero() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.a = 0x40;

    // CMP #$40; CMP #$41
    bus.load_program(&[0xc9, 0x40, 0xc9, 0x41], 0x8000);

    step(&mut cpu, &mut bus, &mut clock);
    assert!(cpu.state.flag(StatusFlags::ZERO));
    assert!(cpu.state.flag(StatusFlags::CARRY));

    step(&mut cpu, &mut bus, &mut clock);
    assert!(!cpu.state.flag(StatusFlags::ZERO));
    assert!(!cpu.state.flag(StatusFlags::CARRY));
    assert!(cpu.state.flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_bit_immediate_only_touches_zero() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.a = 0x01;

    // BIT #$C0
    bus.load_program(&[0x89, 0xc0], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert!(cpu.state.flag(StatusFlags::ZERO));
    assert!(!cpu.state.flag(StatusFlags::NEGATIVE));
    assert!(!cpu.state.flag(StatusFlags::OVERFLOW));
}

#[test]
fn test_tsb_trb() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.a = 0x0f;
    bus.poke(0x0010, 0xf0);

    // TSB $10; TRB $10
    bus.load_program(&[0x04, 0x10, 0x14, 0x10], 0x8000);

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(bus.mem(0x0010), 0xff);
    assert!(cpu.state.flag(StatusFlags::ZERO));

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(bus.mem(0x0010), 0xf0);
    assert!(!cpu.state.flag(StatusFlags::ZERO));
}

#[test]
fn test_xba_swaps_and_flags_low_byte() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.a = 0x8000;

    // XBA
    bus.load_program(&[0xeb], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.a, 0x0080);
    assert_eq!(cycles, 3);
    assert!(cpu.state.flag(StatusFlags::NEGATIVE));
    assert!(!cpu.state.flag(StatusFlags::ZERO));
}

#[test]
fn test_transfers_respect_index_width() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M16X8);
    cpu.state.a = 0x1234;

    // TAX; TXY
    bus.load_program(&[0xaa, 0x9b], 0x8000);
    cpu.run(&mut bus, &mut clock, 2);

    assert_eq!(cpu.state.x, 0x34);
    assert_eq!(cpu.state.y, 0x34);
}

#[test]
fn test_emulation_stack_wraps_in_page_one() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.a = 0x42;

    // PHA; LDA #$00; PLA
    bus.load_program(&[0x48, 0xa9, 0x00, 0x68], 0x8000);

    let cycles = step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cycles, 3);
    assert_eq!(bus.mem(0x0100), 0x42);
    assert_eq!(cpu.state.s, 0x01ff);

    step(&mut cpu, &mut bus, &mut clock);
    let cycles = step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.state.a, 0x42);
    assert_eq!(cpu.state.s, 0x0100);
}

#[test]
fn test_pea_uses_linear_stack_in_emulation() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // PEA $1234
    bus.load_program(&[0xf4, 0x34, 0x12], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cycles, 5);
    assert_eq!(bus.mem(0x0100), 0x12);
    assert_eq!(bus.mem(0x00ff), 0x34);
    assert_eq!(cpu.state.s, 0x01fe);
}

#[test]
fn test_phd_pld_native() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.s = 0x1fff;
    cpu.state.d = 0x8000;

    // PHD; LDA #$00; TCD; PLD
    bus.load_program(&[0x0b, 0xa9, 0x00, 0x5b, 0x2b], 0x8000);
    cpu.run(&mut bus, &mut clock, 3);
    assert_eq!(cpu.state.d, 0x0000);
    assert_eq!(bus.mem(0x1fff), 0x80);

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.d, 0x8000);
    assert_eq!(cpu.state.s, 0x1fff);
    assert!(cpu.state.flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_php_plp_restores_mode() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.s = 0x1fff;

    // PHP; REP #$30; PLP
    bus.load_program(&[0x08, 0xc2, 0x30, 0x28], 0x8000);
    cpu.run(&mut bus, &mut clock, 2);
    assert_eq!(cpu.state.mode, Mode::M16X16);

    cpu.run(&mut bus, &mut clock, 1);
    assert_eq!(cpu.state.mode, Mode::M8X8);
    assert_eq!(cpu.state.s, 0x1fff);
}

#[test]
fn test_branch_cycles() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.pc = 0x80fd;

    // BRA +5 across a page in emulation mode
    bus.load_program(&[0x80, 0x05], 0x80fd);
    let cycles = step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x8104);
    assert_eq!(cycles, 4);

    // Same branch in native mode
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.pc = 0x80fd;
    let cycles = step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x8104);
    assert_eq!(cycles, 3);
}

#[test]
fn test_branch_not_taken() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.p.insert(StatusFlags::ZERO);

    // BNE -2
    bus.load_program(&[0xd0, 0xfe], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc, 0x8002);
    assert_eq!(cycles, 2);
}

#[test]
fn test_backward_branch() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // BEQ -4
    bus.load_program(&[0xf0, 0xfc], 0x8010);
    cpu.state.pc = 0x8010;
    cpu.state.p.insert(StatusFlags::ZERO);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc, 0x800e);
}

#[test]
fn test_brl() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // BRL +$1000
    bus.load_program(&[0x82, 0x00, 0x10], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc, 0x9003);
    assert_eq!(cycles, 4);
}

#[test]
fn test_jmp_variants() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    bus.poke(0x0200, 0x00);
    bus.poke(0x0201, 0x90);
    bus.poke(0x0202, 0x02);

    // JMP ($0200)
    bus.load_program(&[0x6c, 0x00, 0x02], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x9000);

    // JML [$0200]
    bus.load_program(&[0xdc, 0x00, 0x02], 0x9000);
    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc24(), 0x02_9000);

    // JML $00A000
    bus.load_program(&[0x5c, 0x00, 0xa0, 0x00], 0x02_9000);
    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc24(), 0x00_a000);
}

#[test]
fn test_jmp_indexed_indirect_reads_program_bank() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.k = 0x01_0000;
    cpu.state.pc = 0x8000;
    cpu.state.x = 0x02;
    bus.poke(0x01_a002, 0x34);
    bus.poke(0x01_a003, 0x92);

    // JMP ($A000,X)
    bus.load_program(&[0x7c, 0x00, 0xa0], 0x01_8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc24(), 0x01_9234);
}

#[test]
fn test_brk_native() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.s = 0x1fff;
    cpu.state.p.insert(StatusFlags::DECIMAL);
    bus.poke(0xffe6, 0x00);
    bus.poke(0xffe7, 0x90);

    // BRK $00
    bus.load_program(&[0x00, 0x00], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc24(), 0x00_9000);
    assert_eq!(cpu.state.s, 0x1ffb);
    assert_eq!(bus.mem(0x1fff), 0x00);
    assert_eq!(bus.mem(0x1ffe), 0x80);
    assert_eq!(bus.mem(0x1ffd), 0x02);
    assert!(cpu.state.flag(StatusFlags::IRQ_DISABLE));
    assert!(!cpu.state.flag(StatusFlags::DECIMAL));
    assert_eq!(cycles, 8);
}

#[test]
fn test_brk_emulation_sets_break_bit() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.state.s = 0x01ff;
    bus.poke(0xfffe, 0x00);
    bus.poke(0xffff, 0x90);

    // BRK $00
    bus.load_program(&[0x00, 0x00], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc, 0x9000);
    assert_eq!(cpu.state.s, 0x01fc);
    assert_ne!(bus.mem(0x01fd) & 0x10, 0);
}

#[test]
fn test_cop_emulation_vector() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    bus.poke(0xfff4, 0x00);
    bus.poke(0xfff5, 0xa0);

    // COP $00
    bus.load_program(&[0x02, 0x00], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc, 0xa000);
}

#[test]
fn test_rti_native_restores_bank() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.s = 0x1ffb;
    // P, PCL, PCH, K
    bus.poke(0x1ffc, 0x30);
    bus.poke(0x1ffd, 0x56);
    bus.poke(0x1ffe, 0x34);
    bus.poke(0x1fff, 0x12);

    // RTI
    bus.load_program(&[0x40], 0x8000);
    step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cpu.state.pc24(), 0x12_3456);
    assert_eq!(cpu.state.s, 0x1fff);
    assert_eq!(cpu.state.p.bits(), 0x30);
}

#[test]
fn test_mvn_copies_block() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M16X16);
    cpu.state.a = 0x0002;
    cpu.state.x = 0x1000;
    cpu.state.y = 0x2000;
    bus.load_program(&[0x11, 0x22, 0x33], 0x7f_1000);

    // MVN $7E,$7F
    bus.load_program(&[0x54, 0x7e, 0x7f], 0x8000);
    let executed = cpu.run(&mut bus, &mut clock, 3);

    assert_eq!(executed, 3);
    assert_eq!(cpu.state.pc, 0x8003);
    assert_eq!(bus.mem(0x7e_2000), 0x11);
    assert_eq!(bus.mem(0x7e_2001), 0x22);
    assert_eq!(bus.mem(0x7e_2002), 0x33);
    assert_eq!(cpu.state.a, 0xffff);
    assert_eq!(cpu.state.x, 0x1003);
    assert_eq!(cpu.state.y, 0x2003);
    assert_eq!(cpu.state.dbr, 0x7e_0000);
}

#[test]
fn test_mvp_repeats_until_done() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    set_native(&mut cpu, Mode::M8X8);
    cpu.state.a = 0x0001;
    cpu.state.x = 0x11;
    cpu.state.y = 0x21;
    bus.load_program(&[0xaa, 0xbb], 0x00_0010);

    // MVP $00,$00
    bus.load_program(&[0x44, 0x00, 0x00], 0x8000);

    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x8000);
    step(&mut cpu, &mut bus, &mut clock);
    assert_eq!(cpu.state.pc, 0x8003);

    assert_eq!(bus.mem(0x0020), 0xaa);
    assert_eq!(bus.mem(0x0021), 0xbb);
    assert_eq!(cpu.state.x, 0x0f);
    assert_eq!(cpu.state.y, 0x1f);
}

#[test]
fn test_stp_breaks() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // NOP; STP; NOP
    bus.load_program(&[0xea, 0xdb, 0xea], 0x8000);
    let executed = cpu.run(&mut bus, &mut clock, 10);

    assert_eq!(executed, 2);
    assert_eq!(cpu.break_reason(), BreakReason::Stop);
    assert!(cpu.break_message().contains("STP"));
    assert!(cpu.describe_state().contains("break:stop"));
}

#[test]
fn test_wdm_faults_after_operand() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // WDM $42
    bus.load_program(&[0x42, 0x42], 0x8000);
    let executed = cpu.run(&mut bus, &mut clock, 10);

    assert_eq!(executed, 1);
    assert_eq!(cpu.state.pc, 0x8002);
    assert_eq!(cpu.break_reason(), BreakReason::InstructionFault);
}

#[test]
fn test_first_break_reason_wins() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    bus.bad_read = Some(0x8001);

    // WDM with its operand on an unmapped address
    bus.load_program(&[0x42, 0x00], 0x8000);
    cpu.run(&mut bus, &mut clock, 10);

    assert_eq!(cpu.break_reason(), BreakReason::BadRead);
    assert!(cpu.break_message().contains("008001"));
}

#[test]
fn test_run_clears_previous_break() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // WDM $00; NOP
    bus.load_program(&[0x42, 0x00, 0xea], 0x8000);
    cpu.run(&mut bus, &mut clock, 1);
    assert_eq!(cpu.break_reason(), BreakReason::InstructionFault);

    let executed = cpu.run(&mut bus, &mut clock, 1);
    assert_eq!(executed, 1);
    assert_eq!(cpu.break_reason(), BreakReason::None);
    assert_eq!(cpu.state.pc, 0x8003);
}

#[test]
fn test_stopped_cpu_runs_nothing_until_reset() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // STP; INX
    bus.load_program(&[0xdb, 0xe8], 0x8000);
    assert_eq!(cpu.run(&mut bus, &mut clock, 1), 1);
    assert!(cpu.state.stopped);
    assert_eq!(cpu.state.pc, 0x8001);

    let before = bus.accesses + clock.ticks;
    let executed = cpu.run(&mut bus, &mut clock, 5);

    assert_eq!(executed, 0);
    assert_eq!(bus.accesses + clock.ticks, before);
    assert_eq!(cpu.state.pc, 0x8001);
    assert_eq!(cpu.state.x, 0);
    assert_eq!(cpu.break_reason(), BreakReason::Stop);
    assert!(cpu.describe_state().contains("stopped"));

    cpu.reset(&mut bus);
    assert!(!cpu.state.stopped);
    assert_eq!(cpu.run(&mut bus, &mut clock, 1), 1);
    assert_eq!(cpu.break_reason(), BreakReason::Stop);
}

#[test]
fn test_wai_completes() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);

    // WAI
    bus.load_program(&[0xcb], 0x8000);
    let cycles = step(&mut cpu, &mut bus, &mut clock);

    assert_eq!(cycles, 3);
    assert_eq!(cpu.state.pc, 0x8001);
    assert_eq!(cpu.break_reason(), BreakReason::None);
}

#[test]
fn test_slice_does_not_change_result() {
    let (mut cpu, mut bus, mut clock) = setup_cpu();
    cpu.reset(&mut bus);
    cpu.set_slice(2);

    bus.load_program(&[0xe8; 7], 0x8000);
    let executed = cpu.run(&mut bus, &mut clock, 7);

    assert_eq!(executed, 7);
    assert_eq!(cpu.state.x, 7);
    assert_eq!(cpu.state.pc, 0x8007);
}

#[test]
fn test_state_display() {
    let (mut cpu, mut bus, _) = setup_cpu();
    cpu.reset(&mut bus);

    let text = cpu.describe_state();
    assert!(text.contains("PC:8000"));
    assert!(text.contains("[nvMXdIzc]"));
    assert!(text.contains("mode:em"));
}
