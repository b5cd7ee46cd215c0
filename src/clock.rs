use std::cell::Cell;
use std::rc::Rc;

/// Cycle sink. The CPU reports internal operations through `tick_cpu`;
/// timing-aware buses report accesses with the speed class of the region.
pub trait Clock {
    fn tick_master(&mut self, clocks: u64);

    fn tick_cpu(&mut self) {
        self.tick_cpu_n(1);
    }

    fn tick_cpu_n(&mut self, cycles: u32) {
        self.tick_master(cycles as u64 * 6);
    }

    fn tick_div6(&mut self) {
        self.tick_master(6);
    }

    fn tick_div8(&mut self) {
        self.tick_master(8);
    }

    fn tick_div12(&mut self) {
        self.tick_master(12);
    }
}

/// Master clock counter of the console.
///
/// Clones share the counter so the system bus and the CPU can both hold a
/// handle.
#[derive(Debug, Clone, Default)]
pub struct ClockSnes {
    master: Rc<Cell<u64>>,
}

impl ClockSnes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn master_clocks(&self) -> u64 {
        self.master.get()
    }

    pub fn reset(&self) {
        self.master.set(0);
    }
}

impl Clock for ClockSnes {
    fn tick_master(&mut self, clocks: u64) {
        self.master.set(self.master.get().wrapping_add(clocks));
    }
}
