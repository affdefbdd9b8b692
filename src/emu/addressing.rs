//
// addressing.rs --- 6809 addressing modes.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Effective address calculation.
//!
//! Each mode consumes its operand bytes at PC and returns the
//! effective address of the memory operand. The immediate modes
//! return the address of the operand within the instruction stream
//! itself, so every operation can simply load from `ea`.

use crate::emu::cpu::CPU;
use crate::emu::error::{Error, Result};
use crate::emu::mem::Mem;
use crate::emu::opcodes::Mode;

impl <M: Mem> CPU<M> {
    /// Resolve the operand of the current instruction.
    pub(crate) fn resolve(&mut self, mode: Mode) -> Result<u16> {
        match mode {
            Mode::Inherent => Ok(0),
            Mode::Imm8     => Ok(self.imm8()),
            Mode::Imm16    => Ok(self.imm16()),
            Mode::Direct   => Ok(self.direct()),
            Mode::Extended => Ok(self.extended()),
            Mode::Indexed  => self.indexed(),
            Mode::Rel8     => Ok(self.pcrel8()),
            Mode::Rel16    => Ok(self.pcrel16()),
            Mode::Invalid  => Err(Error::InvalidAddressingMode {
                opcode: self.opcode,
                pc: self.inst_pc,
            }),
        }
    }

    /// 8-bit immediate addressing.
    fn imm8(&mut self) -> u16 {
        let addr = self.regs.pc;
        self.regs.pc = self.regs.pc.wrapping_add(1);

        let val = self.mem.loadb(addr);
        self.note_fetched(val);

        addr
    }

    /// 16-bit immediate addressing.
    fn imm16(&mut self) -> u16 {
        let addr = self.regs.pc;
        self.regs.pc = self.regs.pc.wrapping_add(2);

        let hi = self.mem.loadb(addr);
        let lo = self.mem.loadb(addr.wrapping_add(1));
        self.note_fetched(hi);
        self.note_fetched(lo);

        addr
    }

    /// Extended addressing.
    fn extended(&mut self) -> u16 {
        self.fetchw()
    }

    /// Direct addressing.
    fn direct(&mut self) -> u16 {
        let hi = self.regs.dp as u16;
        let lo = self.fetchb() as u16;

        (hi << 8) | lo
    }

    /// Return a reference to an indexed register from a postbyte.
    fn indexed_reg(&mut self, postbyte: u8) -> &mut u16 {
        match (postbyte >> 5) & 0x03 {
            0b00 => &mut self.regs.x,
            0b01 => &mut self.regs.y,
            0b10 => &mut self.regs.u,
            _    => &mut self.regs.s,
        }
    }

    /// Return the register value for an indexed mode postbyte.
    fn indexed_reg_val(&mut self, postbyte: u8) -> u16 {
        *self.indexed_reg(postbyte)
    }

    /// Add a signed offset to an indexed mode register.
    fn indexed_reg_inc(&mut self, postbyte: u8, offset: i16) {
        let p = self.indexed_reg(postbyte);
        *p = p.wrapping_add(offset as u16);
    }

    /// Add a signed offset to the indexed register's value.
    fn indexed_offset(&mut self, postbyte: u8, offset: i16) -> u16 {
        self.indexed_reg_val(postbyte).wrapping_add(offset as u16)
    }

    fn invalid_postbyte(&self, postbyte: u8) -> Error {
        Error::InvalidPostbyte { postbyte: postbyte, pc: self.inst_pc }
    }

    /// Indexed addressing. By far the most complex addressing mode.
    pub(crate) fn indexed(&mut self) -> Result<u16> {
        let postbyte = self.fetchb();

        // If the top bit is clear, it's `EA = ,R + 5-bit offset`.
        if (postbyte & 0x80) == 0 {
            // Mask out 5-bit signed offset and sign extend.
            let offset = ((postbyte << 3) as i8 >> 3) as i16;
            self.extra_cycles += 1;
            return Ok(self.indexed_offset(postbyte, offset));
        }

        // Otherwise, look up the mode based on the lower 4 bits.
        // Bit 4 asks for one more level of indirection.
        let ixmode = postbyte & 0x0f;
        let indirect = (postbyte & 0x10) != 0;

        let (addr, cycles) = match ixmode {
            0b0000 if !indirect => {     // ,R+
                let addr = self.indexed_reg_val(postbyte);
                self.indexed_reg_inc(postbyte, 1);
                (addr, 2)
            },
            0b0001 => {     // ,R++
                let addr = self.indexed_reg_val(postbyte);
                self.indexed_reg_inc(postbyte, 2);
                (addr, 3)
            },
            0b0010 if !indirect => {     // ,-R
                self.indexed_reg_inc(postbyte, -1);
                (self.indexed_reg_val(postbyte), 2)
            },
            0b0011 => {     // ,--R
                self.indexed_reg_inc(postbyte, -2);
                (self.indexed_reg_val(postbyte), 3)
            },
            0b0100 => {     // EA = ,R + 0 offset
                (self.indexed_reg_val(postbyte), 0)
            },
            0b0101 => {     // EA = ,R + B
                let offset = self.regs.b as i8 as i16;
                (self.indexed_offset(postbyte, offset), 1)
            },
            0b0110 => {     // EA = ,R + A
                let offset = self.regs.a as i8 as i16;
                (self.indexed_offset(postbyte, offset), 1)
            },
            0b1000 => {     // EA = ,R + 8-bit offset
                let offset = self.fetchb() as i8 as i16;
                (self.indexed_offset(postbyte, offset), 1)
            },
            0b1001 => {     // EA = ,R + 16-bit offset
                let offset = self.fetchw() as i16;
                (self.indexed_offset(postbyte, offset), 4)
            },
            0b1011 => {     // EA = ,R + D offset
                let offset = self.regs.d() as i16;
                (self.indexed_offset(postbyte, offset), 4)
            },
            0b1100 => {     // EA = ,PC + 8-bit offset
                (self.pcrel8(), 1)
            },
            0b1101 => {     // EA = ,PC + 16-bit offset
                (self.pcrel16(), 5)
            },
            0b1111 if indirect => {     // EA = [, Address]
                // The indirection below is part of this mode's cost.
                (self.fetchw(), 2)
            },
            _ => return Err(self.invalid_postbyte(postbyte)),
        };

        self.extra_cycles += cycles;

        if indirect {
            self.extra_cycles += 3;
            Ok(self.mem.loadw(addr))
        } else {
            Ok(addr)
        }
    }

    /// 8-bit PC-relative addressing.
    pub(crate) fn pcrel8(&mut self) -> u16 {
        let offset = self.fetchb() as i8 as i16;
        self.regs.pc.wrapping_add(offset as u16)
    }

    /// 16-bit PC-relative addressing.
    pub(crate) fn pcrel16(&mut self) -> u16 {
        let offset = self.fetchw();
        self.regs.pc.wrapping_add(offset)
    }
}
