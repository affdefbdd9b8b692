//
// board.rs --- The SBC09 single board computer.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The whole machine: CPU, bus, MMU and clock.
//!
//! ```text
//! $0000-$000F  soft vectors
//! $0010-$03FF  system RAM
//! $0400-$23FF  video buffer
//! $2400-$AFFF  user RAM
//! $B000-$EFFF  banked windows
//! $F000-$FDFF  ROM
//! $FE00-$FE3F  MMU registers
//! $FE40-$FFEF  hardware registers
//! $FFF0-$FFFF  hardware vectors (ROM)
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::emu::banked::BankedMemory;
use crate::emu::bus::{Bus, Event};
use crate::emu::clock::Clock;
use crate::emu::cpu::{VisitedMap, CPU};
use crate::emu::error::{Error, Result};
use crate::emu::fatal::RunFlag;
use crate::emu::loader::{self, Image};
use crate::emu::mem::{RAM, ROM};
use crate::emu::mmu::{registers, Mmu, MmuRegisters};
use crate::emu::regs::RegisterFile;

pub const SOFT_VECTORS: u16     = 0x0000;
pub const SYSTEM_RAM: u16       = 0x0010;
pub const VIDEO_BUFFER: u16     = 0x0400;
pub const USER_RAM: u16         = 0x2400;
pub const BANKED_WINDOWS: u16   = 0xB000;
pub const SYSTEM_ROM: u16       = 0xF000;
pub const MMU_REGISTERS: u16    = 0xFE00;
pub const HARDWARE_REGS: u16    = 0xFE40;
pub const HARDWARE_VECTORS: u16 = 0xFFF0;

const SOFT_VECTORS_SIZE: usize     = 0x0010;
const SYSTEM_RAM_SIZE: usize       = 0x03F0;
const VIDEO_BUFFER_SIZE: usize     = 0x2000;
const USER_RAM_SIZE: usize         = 0x8C00;
const SYSTEM_ROM_SIZE: usize       = 0x0E00;
const HARDWARE_REGS_SIZE: usize    = 0x01B0;
const HARDWARE_VECTORS_SIZE: usize = 0x0010;

pub struct Board {
    cpu: CPU<Bus>,
    mmu: Arc<Mutex<Mmu>>,
    running: RunFlag,
    clock: Clock,
}

impl Board {
    /// Build the standard memory map. The CPU is not reset; load a
    /// program first, then call `reset`.
    pub fn new() -> Result<Board> {
        let mmu = Arc::new(Mutex::new(Mmu::new()));
        let mut bus = Bus::new();

        bus.attach(RAM::named("soft vectors", SOFT_VECTORS_SIZE))?;
        bus.attach(RAM::named("system ram", SYSTEM_RAM_SIZE))?;
        bus.attach(RAM::named("video", VIDEO_BUFFER_SIZE))?;
        bus.attach(RAM::named("user ram", USER_RAM_SIZE))?;
        bus.attach(BankedMemory::new(mmu.clone()))?;
        bus.attach(ROM::new("rom", SYSTEM_ROM_SIZE))?;
        bus.attach(MmuRegisters::new(mmu.clone()))?;
        bus.attach(RAM::named("hardware", HARDWARE_REGS_SIZE))?;
        bus.attach(ROM::new("vectors", HARDWARE_VECTORS_SIZE))?;
        bus.init_all();

        let mut cpu = CPU::new(bus);
        cpu.set_visited_map(Some(VisitedMap::new()));

        Ok(Board {
            cpu: cpu,
            mmu: mmu,
            running: RunFlag::new(),
            clock: Clock::new(),
        })
    }

    pub fn cpu(&self) -> &CPU<Bus> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU<Bus> {
        &mut self.cpu
    }

    pub fn bus(&mut self) -> &mut Bus {
        &mut self.cpu.mem
    }

    /// A shared handle on the MMU.
    pub fn mmu(&self) -> Arc<Mutex<Mmu>> {
        self.mmu.clone()
    }

    pub fn register_file(&self) -> RegisterFile {
        self.cpu.register_file()
    }

    pub fn visited(&self) -> Option<VisitedMap> {
        self.cpu.visited_map().cloned()
    }

    /// A shared handle on the running flag.
    pub fn running(&self) -> RunFlag {
        self.running.clone()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Select a clock speed level. Returns false if it is out of range.
    pub fn set_speed(&mut self, level: usize) -> bool {
        self.clock.set_level(level)
    }

    pub fn load_hex_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Image> {
        loader::load_ihex_file(&mut self.cpu.mem, path)
    }

    pub fn load_hex_str(&mut self, text: &str) -> Result<Image> {
        loader::load_ihex_str(&mut self.cpu.mem, text)
    }

    /// Reset every device, then the CPU. MMU contents are lost.
    pub fn reset(&mut self) {
        self.cpu.mem.dispatch_event(&Event::Reset);
        self.cpu.reset();
        self.running.set_running(true);
        log::info!("reset, PC={:04X}", self.cpu.regs.pc);
    }

    /// Execute one instruction. A CPU fault stops the machine.
    pub fn step(&mut self) -> Result<u32> {
        match self.cpu.step() {
            Ok(n) => Ok(n),
            Err(err) => {
                self.fault(&err);
                Err(err)
            },
        }
    }

    /// Run at the selected clock speed until the running flag is
    /// cleared, by a fault or by whoever else holds the flag.
    pub fn run(&mut self) -> Result<()> {
        self.clock.restart();
        self.cpu.mem.activate_all();

        while self.running.is_running() {
            let due = self.clock.cycles_due();
            for _ in 0..due {
                if let Err(err) = self.cpu.tick() {
                    self.fault(&err);
                    self.cpu.mem.deactivate_all();
                    return Err(err);
                }
            }
        }

        self.cpu.mem.deactivate_all();
        Ok(())
    }

    /// Step unmetered until PC reaches `addr` or the machine stops.
    pub fn run_until(&mut self, addr: u16) -> Result<()> {
        while self.running.is_running() && self.cpu.regs.pc != addr {
            self.step()?;
        }
        Ok(())
    }

    /// Step up to `n` instructions, stopping early if the machine stops.
    pub fn run_steps(&mut self, n: u64) -> Result<()> {
        for _ in 0..n {
            if !self.running.is_running() {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    fn fault(&mut self, err: &Error) {
        if err.is_cpu_fault() {
            self.cpu.dump_regs();
        }
        fatal!(self.running, err);
    }

    /// Shut every device down.
    pub fn quit(&mut self) {
        self.running.stop();
        self.cpu.mem.quit_all();
        let m = registers::lock(&self.mmu);
        log::debug!("MMU: {} free, {} allocated, {} fragged",
                    m.blocks_free(), m.blocks_allocated(), m.blocks_fragged());
    }
}
