//
// mem.rs --- Memory interface and plain memory devices.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use crate::emu::bus::{Device, DeviceKind};

/// Byte returned for reads that no memory answers.
pub const OPEN_BUS: u8 = 0xCC;

/// Operations on memory.
pub trait Mem {
    /// Load a byte from `addr` and return it.
    fn loadb(&mut self, addr: u16) -> u8;

    /// Store a byte at `addr`.
    fn storeb(&mut self, addr: u16, val: u8);

    /// Load a 16-bit value from `addr` and return it.
    fn loadw(&mut self, addr: u16) -> u16 {
        let hi = self.loadb(addr) as u16;
        let lo = self.loadb(addr.wrapping_add(1)) as u16;

        (hi << 8) | lo
    }

    /// Store a 16-bit value at `addr`.
    fn storew(&mut self, addr: u16, val: u16) {
        self.storeb(addr, ((val >> 8) & 0xff) as u8);
        self.storeb(addr.wrapping_add(1), (val & 0xff) as u8);
    }

    /// Store an array of bytes starting at `addr`. Useful for tests.
    fn store(&mut self, mut addr: u16, bytes: &[u8]) {
        for x in bytes.iter() {
            self.storeb(addr, *x);
            addr = addr.wrapping_add(1);
        }
    }

    /// Read an array of bytes starting at `addr`. Useful for tests.
    fn load(&mut self, mut addr: u16, bytes: &mut [u8]) {
        for x in bytes.iter_mut() {
            *x = self.loadb(addr);
            addr = addr.wrapping_add(1);
        }
    }
}

/// A random access memory device.
///
/// Standalone, a `RAM` is addressed from zero. Attached to a `Bus`
/// it is addressed from wherever the bus placed it.
pub struct RAM {
    pub contents: Vec<u8>,
    name: String,
    base: u16,
}

impl RAM {
    /// Create a new `RAM` containing `size` bytes of memory.
    pub fn new(size: usize) -> RAM {
        RAM::named("ram", size)
    }

    /// Create a new `RAM` with a name used in bus diagnostics.
    pub fn named(name: &str, size: usize) -> RAM {
        assert!(size <= 0x10000);
        RAM {
            contents: vec![0u8; size],
            name: name.to_string(),
            base: 0,
        }
    }

    fn offset(&self, addr: u16) -> usize {
        addr.wrapping_sub(self.base) as usize
    }
}

impl Mem for RAM {
    fn loadb(&mut self, addr: u16) -> u8 {
        let off = self.offset(addr);
        self.contents.get(off).cloned().unwrap_or(OPEN_BUS)
    }

    fn storeb(&mut self, addr: u16, val: u8) {
        let off = self.offset(addr);
        if let Some(p) = self.contents.get_mut(off) {
            *p = val;
        }
    }
}

impl Device for RAM {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Ram
    }

    fn on_attach(&mut self, next_free: u16) -> usize {
        self.base = next_free;
        self.contents.len()
    }

    fn on_read(&mut self, addr: u16) -> u8 {
        self.loadb(addr)
    }

    fn on_write(&mut self, addr: u16, val: u8) {
        self.storeb(addr, val);
    }

    fn memory(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.contents)
    }
}

/// A read-only memory device. The CPU cannot change it; the loader
/// fills it through `Bus::write_to_rom`.
pub struct ROM {
    contents: Vec<u8>,
    name: String,
    base: u16,
}

impl ROM {
    pub fn new(name: &str, size: usize) -> ROM {
        assert!(size <= 0x10000);
        ROM {
            contents: vec![0xffu8; size],
            name: name.to_string(),
            base: 0,
        }
    }
}

impl Device for ROM {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Rom
    }

    fn on_attach(&mut self, next_free: u16) -> usize {
        self.base = next_free;
        self.contents.len()
    }

    fn on_read(&mut self, addr: u16) -> u8 {
        let off = addr.wrapping_sub(self.base) as usize;
        self.contents.get(off).cloned().unwrap_or(OPEN_BUS)
    }

    fn on_write(&mut self, addr: u16, val: u8) {
        log::debug!("{}: ignored write of {:02X} to {:04X}", self.name, val, addr);
    }

    fn memory(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.contents)
    }
}
