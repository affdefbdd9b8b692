//
// registers.rs --- MMU register block.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The CPU-visible MMU registers.
//!
//! Word registers are big-endian. A write to the high byte is held in
//! a latch; the word takes effect when its low byte is written, so
//! `STD` updates a register in one step.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::emu::bus::{Device, DeviceKind, Event};
use crate::emu::mmu::{link_to_word, word_to_link, Mmu, PAYLOAD_SIZE};

pub const BANK_1_SELECT: u16    = 0x00;
pub const BANK_2_SELECT: u16    = 0x02;
pub const BLOCKS_FREE: u16      = 0x04;
pub const BLOCKS_ALLOCATED: u16 = 0x06;
pub const BLOCKS_FRAGGED: u16   = 0x08;
pub const ARG_1: u16            = 0x0A;
pub const ARG_2: u16            = 0x0C;
pub const COMMAND: u16          = 0x0E;
pub const ERROR: u16            = 0x0F;
pub const PAYLOAD: u16          = 0x10;
pub const ROOT_NODE: u16        = 0x30;
pub const PREV_NODE: u16        = 0x32;
pub const NEXT_NODE: u16        = 0x34;
pub const RAW_NODE: u16         = 0x36;
pub const NODE_STATUS: u16      = 0x38;

/// Bytes of address space the register block occupies.
pub const REGISTER_BLOCK_SIZE: usize = 0x40;

const PAYLOAD_LAST: u16 = PAYLOAD + PAYLOAD_SIZE as u16 - 1;

/// High bytes written to word registers, waiting for their low byte.
#[derive(Copy, Clone, Debug)]
pub(crate) struct WordLatch {
    hi: [u8; REGISTER_BLOCK_SIZE / 2],
}

impl WordLatch {
    pub(crate) fn new() -> WordLatch {
        WordLatch { hi: [0; REGISTER_BLOCK_SIZE / 2] }
    }
}

fn is_word_register(off: u16) -> bool {
    off < COMMAND || (ROOT_NODE..NODE_STATUS).contains(&off)
}

impl Mmu {
    fn word_register(&self, off: u16) -> u16 {
        let cursor = self.node(self.cursor);
        match off {
            BANK_1_SELECT    => link_to_word(self.bank(0)),
            BANK_2_SELECT    => link_to_word(self.bank(1)),
            BLOCKS_FREE      => self.blocks_free,
            BLOCKS_ALLOCATED => self.blocks_allocated,
            BLOCKS_FRAGGED   => self.blocks_fragged,
            ARG_1            => self.arg1,
            ARG_2            => self.arg2,
            ROOT_NODE        => link_to_word(cursor.and_then(|n| n.root)),
            PREV_NODE        => link_to_word(cursor.and_then(|n| n.prev)),
            NEXT_NODE        => link_to_word(cursor.and_then(|n| n.next)),
            RAW_NODE         => self.cursor,
            _                => 0,
        }
    }

    /// Read the register at `off` within the block.
    pub fn read_register(&self, off: u16) -> u8 {
        match off {
            COMMAND => self.command,
            ERROR => self.error.code(),
            PAYLOAD..=PAYLOAD_LAST => {
                let i = (off - PAYLOAD) as usize;
                self.node(self.cursor).map_or(0, |n| n.payload[i])
            },
            NODE_STATUS => self.node(self.cursor).map_or(0, |n| n.status.bits()),
            _ if is_word_register(off) => {
                let word = self.word_register(off & !1);
                if off & 1 == 0 { (word >> 8) as u8 } else { word as u8 }
            },
            _ => 0,
        }
    }

    /// Write the register at `off` within the block.
    pub fn write_register(&mut self, off: u16, val: u8) {
        match off {
            COMMAND => { self.command(val); },
            PAYLOAD..=PAYLOAD_LAST => self.write_payload_register((off - PAYLOAD) as usize, val),
            _ if is_word_register(off) => {
                let slot = (off / 2) as usize;
                if off & 1 == 0 {
                    self.latch.hi[slot] = val;
                } else {
                    let word = ((self.latch.hi[slot] as u16) << 8) | val as u16;
                    self.commit_word(off & !1, word);
                }
            },
            _ => log::debug!("MMU: write {:02X} to read-only register {:02X} ignored", val, off),
        }
    }

    fn write_payload_register(&mut self, i: usize, val: u8) {
        match self.cursor_node() {
            Ok(idx) => { self.write_payload(idx, i, val); },
            Err(err) => self.fail(err),
        }
    }

    fn commit_word(&mut self, off: u16, word: u16) {
        let res = match off {
            BANK_1_SELECT => self.select_bank(0, word_to_link(word)),
            BANK_2_SELECT => self.select_bank(1, word_to_link(word)),
            ARG_1 => { self.arg1 = word; Ok(()) },
            ARG_2 => { self.arg2 = word; Ok(()) },
            RAW_NODE => self.set_cursor(word),
            _ => {
                log::debug!("MMU: write {:04X} to read-only register {:02X} ignored", word, off);
                Ok(())
            },
        };

        if let Err(err) = res {
            self.fail(err);
        }
    }
}

/////////////////////////////////////////////////////////////////////
// Bus Device

/// Lock a shared MMU, recovering from a poisoned lock.
pub fn lock(mmu: &Mutex<Mmu>) -> MutexGuard<Mmu> {
    mmu.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The MMU register block as seen on the bus.
pub struct MmuRegisters {
    mmu: Arc<Mutex<Mmu>>,
    base: u16,
}

impl MmuRegisters {
    pub fn new(mmu: Arc<Mutex<Mmu>>) -> MmuRegisters {
        MmuRegisters { mmu: mmu, base: 0 }
    }
}

impl Device for MmuRegisters {
    fn name(&self) -> &str {
        "mmu"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Mmu
    }

    fn on_attach(&mut self, next_free: u16) -> usize {
        self.base = next_free;
        REGISTER_BLOCK_SIZE
    }

    fn on_read(&mut self, addr: u16) -> u8 {
        lock(&self.mmu).read_register(addr.wrapping_sub(self.base))
    }

    fn on_write(&mut self, addr: u16, val: u8) {
        lock(&self.mmu).write_register(addr.wrapping_sub(self.base), val);
    }

    fn on_event(&mut self, event: &Event) {
        if let Event::Reset = *event {
            lock(&self.mmu).reset();
        }
    }
}
