//
// cpu.rs --- 6809 CPU core.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! A 6809 CPU core.
//!
//! ## Implementation Notes
//!
//! The CPU is driven one clock edge at a time through `CPU::tick`.
//! The first tick of an instruction does all of its work; the
//! remaining ticks only count down the instruction's cycle cost.
//! `CPU::step` runs a whole instruction at once and is what tests
//! and debuggers normally use.
//!
//! Opcodes are decoded through a table (see `opcodes.rs`) whose
//! entries name an addressing mode, resolved by the methods in
//! `addressing.rs`, and an operation, implemented in `ops.rs`.
//! Interrupt handling lives in `interrupt.rs`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::emu::error::{Error, Result};
use crate::emu::interrupt::{InterruptLines, WaitState};
use crate::emu::mem::Mem;
use crate::emu::opcodes::{self, Handler, Opcode, PAGE2, PAGE3};
use crate::emu::regs::{CCFlags, RegisterFile, Regs, CC_F, CC_I};

/// The reset vector.
pub const VEC_RESET: u16 = 0xFFFE;

/////////////////////////////////////////////////////////////////////
// Visited Address Map

/// One bit per address, set when an instruction starts there.
///
/// Cloning shares the map, so a disassembler running on another
/// thread can read it while the CPU marks it.
#[derive(Clone)]
pub struct VisitedMap {
    bits: Arc<Vec<AtomicU8>>,
}

impl VisitedMap {
    pub fn new() -> VisitedMap {
        let bits = (0..0x10000 / 8).map(|_| AtomicU8::new(0)).collect();
        VisitedMap { bits: Arc::new(bits) }
    }

    pub fn mark(&self, addr: u16) {
        let bit = 1u8 << (addr & 7);
        self.bits[(addr >> 3) as usize].fetch_or(bit, Ordering::Relaxed);
    }

    pub fn is_visited(&self, addr: u16) -> bool {
        let bit = 1u8 << (addr & 7);
        self.bits[(addr >> 3) as usize].load(Ordering::Relaxed) & bit != 0
    }

    pub fn clear(&self) {
        for b in self.bits.iter() {
            b.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for VisitedMap {
    fn default() -> VisitedMap {
        VisitedMap::new()
    }
}

/////////////////////////////////////////////////////////////////////
// CPU Emulation

/// The 6809 CPU core.
pub struct CPU<M: Mem> {
    pub regs: Regs,
    pub mem: M,
    pub(crate) lines: InterruptLines,
    pub(crate) wait: WaitState,
    pub(crate) extra_cycles: u32,   // added by modes and ops
    pub(crate) opcode: u16,         // opcode being executed
    pub(crate) inst_pc: u16,        // address of that opcode
    table: Vec<Option<Opcode<M>>>,
    cycles: u32,                    // ticks left in this instruction
    total_cycles: u64,
    visited: Option<VisitedMap>,
    shared: RegisterFile,
    fetched: Vec<u8>,               // bytes fetched during op cycle
}

impl <M: Mem> CPU<M> {
    /// Create a new CPU given a memory interface.
    ///
    /// The memory interface will often be a `Bus` that implements
    /// address decoding on top of RAM, devices, etc.
    ///
    /// # Examples
    ///
    /// ```
    /// use sbc09::emu::{RAM, CPU};
    ///
    /// let mut cpu = CPU::new(RAM::new(0x10000));
    /// ```
    pub fn new(mem: M) -> CPU<M> {
        CPU {
            regs: Regs::new(),
            mem: mem,
            lines: InterruptLines::new(),
            wait: WaitState::Normal,
            extra_cycles: 0,
            opcode: 0,
            inst_pc: 0,
            table: opcodes::build_table(),
            cycles: 0,
            total_cycles: 0,
            visited: None,
            shared: RegisterFile::new(),
            fetched: Vec::new(),
        }
    }

    /// Return a shared handle on the registers this CPU publishes.
    pub fn register_file(&self) -> RegisterFile {
        self.shared.clone()
    }

    /// Start (or stop) recording executed addresses.
    pub fn set_visited_map(&mut self, map: Option<VisitedMap>) {
        self.visited = map;
    }

    pub fn visited_map(&self) -> Option<&VisitedMap> {
        self.visited.as_ref()
    }

    /// Total clock cycles executed since creation.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Cycles left before the current instruction completes.
    pub fn cycles_pending(&self) -> u32 {
        self.cycles
    }

    pub fn wait_state(&self) -> WaitState {
        self.wait
    }

    /// Look up the table entry for an opcode (`0x10xx`/`0x11xx` for
    /// prefixed opcodes).
    pub fn opcode(&self, code: u16) -> Option<&Opcode<M>> {
        opcodes::slot(code).and_then(|i| self.table[i].as_ref())
    }

    /// Iterate over every defined opcode.
    pub fn opcodes(&self) -> impl Iterator<Item = &Opcode<M>> {
        self.table.iter().filter_map(|e| e.as_ref())
    }

    /// Dump registers to the debug log.
    pub fn dump_regs(&self) {
        log::debug!("*** {:04X} REGS  {}", self.regs.pc, self.regs);
    }

    /// Put the CPU in its reset state and load PC from the reset
    /// vector. NMI stays disabled until the program loads S.
    pub fn reset(&mut self) {
        self.regs.dp = 0;
        self.regs.cc.insert(CC_I | CC_F);
        self.regs.pc = self.mem.loadw(VEC_RESET);
        self.lines.reset();
        self.wait = WaitState::Normal;
        self.cycles = 0;
        self.shared.take_pending();
        self.shared.publish(&self.regs);
    }

    /// Advance the CPU by one clock cycle.
    pub fn tick(&mut self) -> Result<()> {
        if self.cycles > 0 {
            self.cycles -= 1;
            return Ok(());
        }

        if let Some(pending) = self.shared.take_pending() {
            pending.apply(&mut self.regs);
            if let Some(s) = pending.s {
                self.set_s(s);
            }
        }

        let res = match self.service_interrupts() {
            Some(n) => Ok(n),
            None if self.wait != WaitState::Normal => Ok(1),
            None => self.execute_next(),
        };

        self.shared.publish(&self.regs);

        let used = res?;
        self.cycles = used.saturating_sub(1);
        self.total_cycles += used as u64;
        Ok(())
    }

    /// Finish the current instruction, then execute the next one and
    /// return its cycle count.
    pub fn step(&mut self) -> Result<u32> {
        self.cycles = 0;
        let start = self.total_cycles;
        self.tick()?;
        Ok((self.total_cycles - start) as u32)
    }

    /// Execute the next `n` instructions starting at the
    /// current value of the program counter.
    pub fn step_n(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Run the CPU until the PC equals `addr`.
    pub fn run_until(&mut self, pc_stop: u16) -> Result<()> {
        while self.regs.pc != pc_stop {
            self.step()?;
        }
        Ok(())
    }

    /// Fetch, decode and execute one instruction. Returns the number
    /// of cycles it took.
    fn execute_next(&mut self) -> Result<u32> {
        let pc = self.regs.pc;

        self.fetched.clear();
        self.inst_pc = pc;
        let mut opcode = self.fetchb() as u16;
        if opcode == PAGE2 as u16 || opcode == PAGE3 as u16 {
            opcode = (opcode << 8) | self.fetchb() as u16;
        }
        self.opcode = opcode;

        let entry = match opcodes::slot(opcode).and_then(|i| self.table[i]) {
            Some(e) => e,
            None => return Err(Error::InvalidOpcode { opcode: opcode, pc: pc }),
        };

        if let Some(ref map) = self.visited {
            map.mark(pc);
        }

        self.extra_cycles = 0;
        match entry.handler {
            Handler::Inherent(f) => f(self),
            Handler::Operand(f) => {
                let ea = self.resolve(entry.mode)?;
                f(self, ea);
            }
        }

        if log::log_enabled!(log::Level::Trace) {
            let bytes: Vec<String> =
                self.fetched.iter().map(|b| format!("{:02X}", b)).collect();
            log::trace!("*** {:04X} {:<6} {}", pc, entry.mnemonic, bytes.join(" "));
        }

        Ok(entry.cycles as u32 + self.extra_cycles)
    }

    /// Read an 8-bit value from memory at `pc` then increment `pc` by 1.
    pub(crate) fn fetchb(&mut self) -> u8 {
        let val = self.mem.loadb(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.fetched.push(val);
        val
    }

    /// Read a 16-bit value from memory at `pc` then increment `pc` by 2.
    pub(crate) fn fetchw(&mut self) -> u16 {
        let hi = self.fetchb() as u16;
        let lo = self.fetchb() as u16;

        (hi << 8) | lo
    }

    /// Record operand bytes read in place by the immediate modes.
    pub(crate) fn note_fetched(&mut self, val: u8) {
        self.fetched.push(val);
    }

    /// Load S. The first load arms NMI.
    pub(crate) fn set_s(&mut self, val: u16) {
        self.regs.s = val;
        self.lines.nmi_disabled = false;
    }

    pub(crate) fn set_cc(&mut self, val: u8) {
        self.regs.cc = CCFlags::from_bits_retain(val);
    }

    /// Push a byte onto the SP stack.
    pub(crate) fn pushb_s(&mut self, val: u8) {
        self.regs.s = self.regs.s.wrapping_sub(1);
        self.mem.storeb(self.regs.s, val);
    }

    /// Pop a byte from the SP stack.
    pub(crate) fn popb_s(&mut self) -> u8 {
        let val = self.mem.loadb(self.regs.s);
        self.regs.s = self.regs.s.wrapping_add(1);
        val
    }

    /// Push a word onto the SP stack.
    pub(crate) fn pushw_s(&mut self, val: u16) {
        self.pushb_s((val & 0xff) as u8);
        self.pushb_s(((val >> 8) & 0xff) as u8);
    }

    /// Pop a word from the SP stack.
    pub(crate) fn popw_s(&mut self) -> u16 {
        let hi = self.popb_s() as u16;
        let lo = self.popb_s() as u16;
        (hi << 8) | lo
    }

    /// Push a byte onto the user stack.
    pub(crate) fn pushb_u(&mut self, val: u8) {
        self.regs.u = self.regs.u.wrapping_sub(1);
        self.mem.storeb(self.regs.u, val);
    }

    /// Pop a byte from the user stack.
    pub(crate) fn popb_u(&mut self) -> u8 {
        let val = self.mem.loadb(self.regs.u);
        self.regs.u = self.regs.u.wrapping_add(1);
        val
    }

    /// Push a word onto the user stack.
    pub(crate) fn pushw_u(&mut self, val: u16) {
        self.pushb_u((val & 0xff) as u8);
        self.pushb_u(((val >> 8) & 0xff) as u8);
    }

    /// Pop a word from the user stack.
    pub(crate) fn popw_u(&mut self) -> u16 {
        let hi = self.popb_u() as u16;
        let lo = self.popb_u() as u16;
        (hi << 8) | lo
    }

    /// Push PC, U, Y, X, DP, B, A and CC onto the system stack.
    pub(crate) fn push_entire_state(&mut self) {
        let regs = self.regs;

        self.pushw_s(regs.pc);
        self.pushw_s(regs.u);
        self.pushw_s(regs.y);
        self.pushw_s(regs.x);
        self.pushb_s(regs.dp);
        self.pushb_s(regs.b);
        self.pushb_s(regs.a);
        self.pushb_s(regs.cc.bits());
    }
}

#[cfg(test)]
macro_rules! assert_flags {
    ($cpu:expr => $($flag:ident: $val:expr),*) => (
        $(assert!($cpu.regs.cc.contains($flag) == $val,
                  "flag {} expected {}", stringify!($flag), $val);)*);
}

#[cfg(test)]
#[path = "cpu_test.rs"]
mod tests;

#[cfg(test)]
#[path = "interrupt_test.rs"]
mod interrupt_tests;
