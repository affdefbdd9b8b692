//
// banked.rs --- Banked memory windows onto MMU chains.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Two 8K windows into MMU memory.
//!
//! Offset `o` in a window is byte `o % 32` of the node `o / 32` steps
//! down the chain selected into that window. With no chain selected
//! the window is ordinary RAM.

use std::sync::{Arc, Mutex};

use crate::emu::bus::{Device, DeviceKind};
use crate::emu::mmu::{registers, Mmu, BANK_COUNT, BANK_SIZE};

/// The banked window device.
pub struct BankedMemory {
    mmu: Arc<Mutex<Mmu>>,
    base: u16,
    defaults: Vec<u8>,      // RAM behind unmapped windows
}

impl BankedMemory {
    pub fn new(mmu: Arc<Mutex<Mmu>>) -> BankedMemory {
        BankedMemory {
            mmu: mmu,
            base: 0,
            defaults: vec![0u8; BANK_COUNT * BANK_SIZE],
        }
    }

    /// Split an absolute address into a window number and offset.
    fn locate(&self, addr: u16) -> (usize, u16) {
        let off = addr.wrapping_sub(self.base) as usize;
        (off / BANK_SIZE, (off % BANK_SIZE) as u16)
    }
}

impl Device for BankedMemory {
    fn name(&self) -> &str {
        "banked"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Banked
    }

    fn on_attach(&mut self, next_free: u16) -> usize {
        self.base = next_free;
        BANK_COUNT * BANK_SIZE
    }

    fn on_read(&mut self, addr: u16) -> u8 {
        let (bank, off) = self.locate(addr);
        let mapped = registers::lock(&self.mmu).bank_read(bank, off);

        match mapped {
            Some(val) => val,
            None => self.defaults[bank * BANK_SIZE + off as usize],
        }
    }

    fn on_write(&mut self, addr: u16, val: u8) {
        let (bank, off) = self.locate(addr);
        let mapped = registers::lock(&self.mmu).bank_write(bank, off, val);

        if !mapped {
            self.defaults[bank * BANK_SIZE + off as usize] = val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::mmu::commands::PG_ALLOC;
    use crate::emu::mmu::{MmuError, NodeStatus};

    fn setup() -> (Arc<Mutex<Mmu>>, BankedMemory) {
        let mmu = Arc::new(Mutex::new(Mmu::new()));
        let mut banked = BankedMemory::new(mmu.clone());
        assert_eq!(banked.on_attach(0xB000), 0x4000);
        (mmu, banked)
    }

    fn page(mmu: &Arc<Mutex<Mmu>>) -> u16 {
        let mut m = registers::lock(mmu);
        assert_eq!(m.command(PG_ALLOC), MmuError::None);
        m.arg1()
    }

    #[test]
    fn paging_round_trip() {
        let (mmu, mut banked) = setup();

        // Fill the unmapped window with a known pattern first.
        for i in 0..BANK_SIZE as u16 {
            banked.on_write(0xB000 + i, (i % 7) as u8);
        }

        let handle = page(&mmu);
        registers::lock(&mmu).select_bank(0, Some(handle)).unwrap();

        for i in 0..BANK_SIZE as u16 {
            banked.on_write(0xB000 + i, (i ^ (i >> 8)) as u8);
        }
        for i in 0..BANK_SIZE as u16 {
            assert_eq!(banked.on_read(0xB000 + i), (i ^ (i >> 8)) as u8);
        }

        registers::lock(&mmu).select_bank(0, None).unwrap();
        for i in 0..BANK_SIZE as u16 {
            assert_eq!(banked.on_read(0xB000 + i), (i % 7) as u8);
        }
    }

    #[test]
    fn windows_are_independent() {
        let (mmu, mut banked) = setup();
        let h1 = page(&mmu);
        let h2 = page(&mmu);

        {
            let mut m = registers::lock(&mmu);
            m.select_bank(0, Some(h1)).unwrap();
            m.select_bank(1, Some(h2)).unwrap();
        }

        banked.on_write(0xB000, 0x11);
        banked.on_write(0xD000, 0x22);
        assert_eq!(banked.on_read(0xB000), 0x11);
        assert_eq!(banked.on_read(0xD000), 0x22);

        // Offset 0x21 is byte 1 of the second node of the page.
        banked.on_write(0xB021, 0x33);
        let m = registers::lock(&mmu);
        let second = m.chain(h1).nth(1).unwrap();
        assert_eq!(m.node(second).unwrap().payload[1], 0x33);
    }

    #[test]
    fn short_chain_sets_bank_error() {
        let (mmu, mut banked) = setup();
        let handle = {
            let mut m = registers::lock(&mmu);
            m.allocate(2, NodeStatus::empty()).unwrap()
        };
        registers::lock(&mmu).select_bank(1, Some(handle)).unwrap();

        // Third node of a two node chain.
        banked.on_write(0xD040, 0x99);
        assert_eq!(registers::lock(&mmu).error(), MmuError::Bank);
        assert_eq!(banked.on_read(0xD040), 0x00);

        // The default RAM behind the window is untouched.
        registers::lock(&mmu).select_bank(1, None).unwrap();
        assert_eq!(banked.on_read(0xD040), 0x00);
    }

    #[test]
    fn locked_page_ignores_writes() {
        let (mmu, mut banked) = setup();
        let handle = page(&mmu);
        {
            let mut m = registers::lock(&mmu);
            m.select_bank(0, Some(handle)).unwrap();
            m.set_cursor(handle).unwrap();
            m.command(crate::emu::mmu::commands::LOCK_NODE);
        }

        // Locking the root protects the whole chain.
        banked.on_write(0xB000, 0xAA);
        banked.on_write(0xB100, 0xBB);
        assert_eq!(banked.on_read(0xB000), 0x00);
        assert_eq!(banked.on_read(0xB100), 0x00);
    }
}
