//
// bus.rs --- Address decoding for memory-mapped devices.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The system bus.
//!
//! Devices are attached one after another, each taking as much of
//! the 64K address space as it asks for. The layout is fixed once the
//! machine starts, so reads and writes simply scan the short list of
//! attached ranges.

use crate::emu::error::{Error, Result};
use crate::emu::mem::{Mem, OPEN_BUS};

/// Size of the CPU address space.
pub const ADDRESS_SPACE: usize = 0x10000;

/// What sort of thing a device is. ROM is the only kind the bus
/// treats specially.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Ram,
    Rom,
    Mmu,
    Banked,
    Hardware,
}

/// Events broadcast to every attached device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Reset,
}

/// A device attached to the bus.
///
/// Addresses passed to `on_read` and `on_write` are absolute; a
/// device remembers where it was attached if it needs offsets.
pub trait Device: Send {
    fn name(&self) -> &str;
    fn kind(&self) -> DeviceKind;

    /// Called once when the device is attached at `next_free`.
    /// Returns the number of bytes of address space to reserve.
    fn on_attach(&mut self, next_free: u16) -> usize;

    fn on_init(&mut self) {}
    fn on_quit(&mut self) {}
    fn on_activate(&mut self) {}
    fn on_deactivate(&mut self) {}

    fn on_read(&mut self, addr: u16) -> u8;
    fn on_write(&mut self, addr: u16, val: u8);

    /// Called from the host loop with the seconds since the last update.
    fn on_update(&mut self, _dt: f32) {}
    fn on_render(&mut self) {}
    fn on_event(&mut self, _event: &Event) {}

    /// The device's backing store, for debugger access that must not
    /// trigger side effects.
    fn memory(&mut self) -> Option<&mut [u8]> {
        None
    }
}

/// One attached device and the range it answers to.
pub struct MemoryNode {
    pub base: u16,
    pub size: usize,
    pub kind: DeviceKind,
    device: Box<dyn Device>,
}

impl MemoryNode {
    fn contains(&self, addr: u16) -> bool {
        let addr = addr as usize;
        let base = self.base as usize;
        addr >= base && addr < base + self.size
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }
}

/// The system bus.
pub struct Bus {
    nodes: Vec<MemoryNode>,
    cursor: usize,      // next free address
}

impl Bus {
    pub fn new() -> Bus {
        Bus {
            nodes: Vec::new(),
            cursor: 0,
        }
    }

    /// Attach a device at the next free address and return its base.
    pub fn attach<D: Device + 'static>(&mut self, device: D) -> Result<u16> {
        let mut device = Box::new(device);
        let base = self.cursor;
        let size = device.on_attach(base as u16);

        if size == 0 {
            return Err(Error::ZeroSizeDevice {
                name: device.name().to_string(),
                base: base as u16,
            });
        }
        if base + size > ADDRESS_SPACE {
            return Err(Error::AddressSpaceExhausted {
                name: device.name().to_string(),
                base: base,
                size: size,
            });
        }

        log::debug!("attached {} at {:04X}-{:04X}", device.name(), base, base + size - 1);

        self.nodes.push(MemoryNode {
            base: base as u16,
            size: size,
            kind: device.kind(),
            device: device,
        });
        self.cursor = base + size;
        Ok(base as u16)
    }

    /// The next address a device would be attached at.
    pub fn next_free(&self) -> usize {
        self.cursor
    }

    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    fn find(&mut self, addr: u16) -> Option<&mut MemoryNode> {
        self.nodes.iter_mut().find(|n| n.contains(addr))
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match self.find(addr) {
            Some(node) => node.device.on_read(addr),
            None => OPEN_BUS,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if let Some(node) = self.find(addr) {
            node.device.on_write(addr, val);
        }
    }

    /// Read without side effects where the device allows it.
    pub fn debug_read(&mut self, addr: u16) -> u8 {
        let node = match self.find(addr) {
            Some(node) => node,
            None => return OPEN_BUS,
        };

        let off = (addr - node.base) as usize;
        match node.device.memory() {
            Some(mem) => mem.get(off).cloned().unwrap_or(OPEN_BUS),
            None => node.device.on_read(addr),
        }
    }

    /// Write without side effects where the device allows it. ROM
    /// refuses; use `write_to_rom`. Returns true if the byte landed
    /// somewhere.
    pub fn debug_write(&mut self, addr: u16, val: u8) -> bool {
        match self.find(addr) {
            Some(node) if node.kind == DeviceKind::Rom => {
                log::debug!("debug write to ROM at {:04X} refused", addr);
                false
            },
            Some(node) => Bus::poke(node, addr, val),
            None => false,
        }
    }

    /// Write into ROM (or any device with a backing store).
    pub fn write_to_rom(&mut self, addr: u16, val: u8) -> bool {
        match self.find(addr) {
            Some(node) => Bus::poke(node, addr, val),
            None => false,
        }
    }

    fn poke(node: &mut MemoryNode, addr: u16, val: u8) -> bool {
        let off = (addr - node.base) as usize;
        match node.device.memory() {
            Some(mem) => match mem.get_mut(off) {
                Some(p) => { *p = val; true },
                None => false,
            },
            None => {
                node.device.on_write(addr, val);
                true
            },
        }
    }

    pub fn init_all(&mut self) {
        for n in self.nodes.iter_mut() { n.device.on_init(); }
    }

    pub fn quit_all(&mut self) {
        for n in self.nodes.iter_mut() { n.device.on_quit(); }
    }

    pub fn activate_all(&mut self) {
        for n in self.nodes.iter_mut() { n.device.on_activate(); }
    }

    pub fn deactivate_all(&mut self) {
        for n in self.nodes.iter_mut() { n.device.on_deactivate(); }
    }

    pub fn update_all(&mut self, dt: f32) {
        for n in self.nodes.iter_mut() { n.device.on_update(dt); }
    }

    pub fn render_all(&mut self) {
        for n in self.nodes.iter_mut() { n.device.on_render(); }
    }

    pub fn dispatch_event(&mut self, event: &Event) {
        for n in self.nodes.iter_mut() { n.device.on_event(event); }
    }
}

impl Default for Bus {
    fn default() -> Bus {
        Bus::new()
    }
}

impl Mem for Bus {
    fn loadb(&mut self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn storeb(&mut self, addr: u16, val: u8) {
        self.write(addr, val);
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod tests;
