//
// ops.rs --- 6809 instruction implementations.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Instruction implementations.
//!
//! Operations with a memory operand take the effective address
//! computed by the addressing mode. Immediate operands are read from
//! that address as well, since the immediate modes return the address
//! of the operand in the instruction stream.

use crate::emu::cpu::CPU;
use crate::emu::interrupt::{WaitState, VEC_SWI, VEC_SWI2, VEC_SWI3};
use crate::emu::mem::Mem;
use crate::emu::regs::{CCFlags, CC_C, CC_E, CC_F, CC_H, CC_I, CC_N, CC_V, CC_Z};

/// Cycles RTI spends pulling the rest of an entire-state frame.
const RTI_ENTIRE_CYCLES: u32 = 9;

/// Generate a short and a long branch on one condition. Long
/// branches cost a cycle more when taken.
macro_rules! branches {
    ($($short:ident, $long:ident => $cond:ident;)*) => {
        $(
            pub(crate) fn $short(&mut self, ea: u16) {
                if self.$cond() {
                    self.regs.pc = ea;
                }
            }

            pub(crate) fn $long(&mut self, ea: u16) {
                if self.$cond() {
                    self.regs.pc = ea;
                    self.extra_cycles += 1;
                }
            }
        )*
    }
}

#[allow(non_snake_case)]
impl <M: Mem> CPU<M> {
    /////////////////////////////////////////////////////////////////
    // Flag helpers

    fn set_nz8(&mut self, c: u8) {
        self.regs.cc.set(CC_N, (c & 0x80) != 0);
        self.regs.cc.set(CC_Z, c == 0);
    }

    fn set_nz16(&mut self, c: u16) {
        self.regs.cc.set(CC_N, (c & 0x8000) != 0);
        self.regs.cc.set(CC_Z, c == 0);
    }

    /// Set V and C from an 8-bit operation `c = a op b` carried out
    /// in 16 bits. Works for both addition and subtraction.
    fn set_vc8(&mut self, a: u16, b: u16, c: u16) {
        self.regs.cc.set(CC_C, (c & 0x100) != 0);
        self.regs.cc.set(CC_V, ((a ^ b ^ c ^ (c >> 1)) & 0x80) != 0);
    }

    fn set_vc16(&mut self, a: u32, b: u32, c: u32) {
        self.regs.cc.set(CC_C, (c & 0x10000) != 0);
        self.regs.cc.set(CC_V, ((a ^ b ^ c ^ (c >> 1)) & 0x8000) != 0);
    }

    fn carry(&self) -> u16 {
        if self.regs.cc.contains(CC_C) { 1 } else { 0 }
    }

    /////////////////////////////////////////////////////////////////
    // Arithmetic

    /// Add `b` and an optional carry to `a`, setting H, N, Z, V and C.
    fn add8(&mut self, a: u8, b: u8, carry: bool) -> u8 {
        let a = a as u16;
        let b = b as u16;
        let c = a + b + if carry { self.carry() } else { 0 };

        self.regs.cc.set(CC_H, ((a ^ b ^ c) & 0x10) != 0);
        self.set_vc8(a, b, c);
        self.set_nz8(c as u8);
        c as u8
    }

    /// Subtract `b` and an optional borrow from `a`. H is undefined
    /// after a subtract and is left alone.
    fn sub8(&mut self, a: u8, b: u8, borrow: bool) -> u8 {
        let a = a as u16;
        let b = b as u16;
        let c = a.wrapping_sub(b).wrapping_sub(if borrow { self.carry() } else { 0 });

        self.set_vc8(a, b, c);
        self.set_nz8(c as u8);
        c as u8
    }

    fn add16(&mut self, a: u16, b: u16) -> u16 {
        let a = a as u32;
        let b = b as u32;
        let c = a + b;

        self.set_vc16(a, b, c);
        self.set_nz16(c as u16);
        c as u16
    }

    fn sub16(&mut self, a: u16, b: u16) -> u16 {
        let a = a as u32;
        let b = b as u32;
        let c = a.wrapping_sub(b);

        self.set_vc16(a, b, c);
        self.set_nz16(c as u16);
        c as u16
    }

    pub(crate) fn op_ADDA(&mut self, ea: u16) {
        let (a, m) = (self.regs.a, self.mem.loadb(ea));
        self.regs.a = self.add8(a, m, false);
    }

    pub(crate) fn op_ADDB(&mut self, ea: u16) {
        let (b, m) = (self.regs.b, self.mem.loadb(ea));
        self.regs.b = self.add8(b, m, false);
    }

    pub(crate) fn op_ADCA(&mut self, ea: u16) {
        let (a, m) = (self.regs.a, self.mem.loadb(ea));
        self.regs.a = self.add8(a, m, true);
    }

    pub(crate) fn op_ADCB(&mut self, ea: u16) {
        let (b, m) = (self.regs.b, self.mem.loadb(ea));
        self.regs.b = self.add8(b, m, true);
    }

    pub(crate) fn op_SUBA(&mut self, ea: u16) {
        let (a, m) = (self.regs.a, self.mem.loadb(ea));
        self.regs.a = self.sub8(a, m, false);
    }

    pub(crate) fn op_SUBB(&mut self, ea: u16) {
        let (b, m) = (self.regs.b, self.mem.loadb(ea));
        self.regs.b = self.sub8(b, m, false);
    }

    pub(crate) fn op_SBCA(&mut self, ea: u16) {
        let (a, m) = (self.regs.a, self.mem.loadb(ea));
        self.regs.a = self.sub8(a, m, true);
    }

    pub(crate) fn op_SBCB(&mut self, ea: u16) {
        let (b, m) = (self.regs.b, self.mem.loadb(ea));
        self.regs.b = self.sub8(b, m, true);
    }

    /// Compares the contents of memory location to the contents of the
    /// specified register and sets the appropriate condition codes.
    /// Neither memory location M nor the specified register is
    /// modified.
    pub(crate) fn op_CMPA(&mut self, ea: u16) {
        let (a, m) = (self.regs.a, self.mem.loadb(ea));
        self.sub8(a, m, false);
    }

    pub(crate) fn op_CMPB(&mut self, ea: u16) {
        let (b, m) = (self.regs.b, self.mem.loadb(ea));
        self.sub8(b, m, false);
    }

    pub(crate) fn op_ADDD(&mut self, ea: u16) {
        let (d, m) = (self.regs.d(), self.mem.loadw(ea));
        let res = self.add16(d, m);
        self.regs.set_d(res);
    }

    pub(crate) fn op_SUBD(&mut self, ea: u16) {
        let (d, m) = (self.regs.d(), self.mem.loadw(ea));
        let res = self.sub16(d, m);
        self.regs.set_d(res);
    }

    fn cmp16(&mut self, reg: u16, ea: u16) {
        let m = self.mem.loadw(ea);
        self.sub16(reg, m);
    }

    pub(crate) fn op_CMPD(&mut self, ea: u16) {
        let d = self.regs.d();
        self.cmp16(d, ea);
    }

    pub(crate) fn op_CMPX(&mut self, ea: u16) {
        let x = self.regs.x;
        self.cmp16(x, ea);
    }

    pub(crate) fn op_CMPY(&mut self, ea: u16) {
        let y = self.regs.y;
        self.cmp16(y, ea);
    }

    pub(crate) fn op_CMPU(&mut self, ea: u16) {
        let u = self.regs.u;
        self.cmp16(u, ea);
    }

    pub(crate) fn op_CMPS(&mut self, ea: u16) {
        let s = self.regs.s;
        self.cmp16(s, ea);
    }

    /////////////////////////////////////////////////////////////////
    // Logical

    fn logic8(&mut self, res: u8) -> u8 {
        self.set_nz8(res);
        self.regs.cc.remove(CC_V);
        res
    }

    pub(crate) fn op_ANDA(&mut self, ea: u16) {
        let res = self.regs.a & self.mem.loadb(ea);
        self.regs.a = self.logic8(res);
    }

    pub(crate) fn op_ANDB(&mut self, ea: u16) {
        let res = self.regs.b & self.mem.loadb(ea);
        self.regs.b = self.logic8(res);
    }

    /// Performs the logical AND of the contents of accumulator A or B and
    /// the contents of memory location M and modifies the condition codes
    /// accordingly. The contents of neither are affected.
    pub(crate) fn op_BITA(&mut self, ea: u16) {
        let res = self.regs.a & self.mem.loadb(ea);
        self.logic8(res);
    }

    pub(crate) fn op_BITB(&mut self, ea: u16) {
        let res = self.regs.b & self.mem.loadb(ea);
        self.logic8(res);
    }

    pub(crate) fn op_ORA(&mut self, ea: u16) {
        let res = self.regs.a | self.mem.loadb(ea);
        self.regs.a = self.logic8(res);
    }

    pub(crate) fn op_ORB(&mut self, ea: u16) {
        let res = self.regs.b | self.mem.loadb(ea);
        self.regs.b = self.logic8(res);
    }

    pub(crate) fn op_EORA(&mut self, ea: u16) {
        let res = self.regs.a ^ self.mem.loadb(ea);
        self.regs.a = self.logic8(res);
    }

    pub(crate) fn op_EORB(&mut self, ea: u16) {
        let res = self.regs.b ^ self.mem.loadb(ea);
        self.regs.b = self.logic8(res);
    }

    /////////////////////////////////////////////////////////////////
    // Read-modify-write

    /// Replaces the operand with its twos complement. The C (carry) bit
    /// represents a borrow and is set to the inverse of the resulting
    /// binary carry. Note that 0x80 is replaced by itself and only in
    /// this case is the V (overflow) bit set.
    fn neg(&mut self, val: u8) -> u8 {
        self.sub8(0, val, false)
    }

    pub(crate) fn op_NEG(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.neg(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_NEGA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.neg(val);
    }

    pub(crate) fn op_NEGB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.neg(val);
    }

    /// Replaces the operand with its logical complement.
    ///
    /// Condition Codes:
    ///
    ///   N - Set if the result is negative; cleared otherwise.
    ///   Z - Set if the result is zero; cleared otherwise.
    ///   V - Always cleared.
    ///   C - Always set.
    fn com(&mut self, val: u8) -> u8 {
        let res = self.logic8(!val);
        self.regs.cc.insert(CC_C);
        res
    }

    pub(crate) fn op_COM(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.com(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_COMA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.com(val);
    }

    pub(crate) fn op_COMB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.com(val);
    }

    /// Shifts the operand one place left. Bit seven goes into C and V
    /// gets bit seven XOR bit six of the original operand.
    fn lsl(&mut self, val: u8) -> u8 {
        let res = val << 1;
        self.set_nz8(res);
        self.regs.cc.set(CC_C, (val & 0x80) != 0);
        self.regs.cc.set(CC_V, (val ^ (val << 1)) & 0x80 != 0);
        res
    }

    pub(crate) fn op_LSL(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.lsl(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_LSLA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.lsl(val);
    }

    pub(crate) fn op_LSLB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.lsl(val);
    }

    /// Logical shift right. N is always cleared.
    fn lsr(&mut self, val: u8) -> u8 {
        let res = val >> 1;
        self.set_nz8(res);
        self.regs.cc.set(CC_C, (val & 0x01) != 0);
        res
    }

    pub(crate) fn op_LSR(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.lsr(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_LSRA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.lsr(val);
    }

    pub(crate) fn op_LSRB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.lsr(val);
    }

    /// Arithmetic shift right. Bit seven is held constant.
    fn asr(&mut self, val: u8) -> u8 {
        let res = ((val as i8) >> 1) as u8;
        self.set_nz8(res);
        self.regs.cc.set(CC_C, (val & 0x01) != 0);
        res
    }

    pub(crate) fn op_ASR(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.asr(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_ASRA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.asr(val);
    }

    pub(crate) fn op_ASRB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.asr(val);
    }

    /// Rotate right through carry, a 9-bit rotation.
    fn ror(&mut self, val: u8) -> u8 {
        let hi = if self.regs.cc.contains(CC_C) { 0x80 } else { 0x00 };
        let res = (val >> 1) | hi;

        self.set_nz8(res);
        self.regs.cc.set(CC_C, (val & 0x01) != 0);
        res
    }

    pub(crate) fn op_ROR(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.ror(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_RORA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.ror(val);
    }

    pub(crate) fn op_RORB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.ror(val);
    }

    /// Rotate left through carry, a 9-bit rotation.
    fn rol(&mut self, val: u8) -> u8 {
        let lo = if self.regs.cc.contains(CC_C) { 0x01 } else { 0x00 };
        let res = (val << 1) | lo;

        self.set_nz8(res);
        self.regs.cc.set(CC_C, (val & 0x80) != 0);
        self.regs.cc.set(CC_V, (val ^ (val << 1)) & 0x80 != 0);
        res
    }

    pub(crate) fn op_ROL(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.rol(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_ROLA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.rol(val);
    }

    pub(crate) fn op_ROLB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.rol(val);
    }

    /// Decrement. C is not affected, so this works as a loop counter
    /// in multiple precision code.
    fn dec(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        self.set_nz8(res);
        self.regs.cc.set(CC_V, val == 0x80);
        res
    }

    pub(crate) fn op_DEC(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.dec(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_DECA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.dec(val);
    }

    pub(crate) fn op_DECB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.dec(val);
    }

    fn inc(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        self.set_nz8(res);
        self.regs.cc.set(CC_V, val == 0x7F);
        res
    }

    pub(crate) fn op_INC(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        let res = self.inc(val);
        self.mem.storeb(ea, res);
    }

    pub(crate) fn op_INCA(&mut self) {
        let val = self.regs.a;
        self.regs.a = self.inc(val);
    }

    pub(crate) fn op_INCB(&mut self) {
        let val = self.regs.b;
        self.regs.b = self.inc(val);
    }

    pub(crate) fn op_TST(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        self.logic8(val);
    }

    pub(crate) fn op_TSTA(&mut self) {
        let val = self.regs.a;
        self.logic8(val);
    }

    pub(crate) fn op_TSTB(&mut self) {
        let val = self.regs.b;
        self.logic8(val);
    }

    fn clr(&mut self) {
        self.regs.cc.remove(CC_N | CC_V | CC_C);
        self.regs.cc.insert(CC_Z);
    }

    /// Note that the EA is read during this operation.
    pub(crate) fn op_CLR(&mut self, ea: u16) {
        let _ = self.mem.loadb(ea);
        self.mem.storeb(ea, 0x00);
        self.clr();
    }

    pub(crate) fn op_CLRA(&mut self) {
        self.regs.a = 0x00;
        self.clr();
    }

    pub(crate) fn op_CLRB(&mut self) {
        self.regs.b = 0x00;
        self.clr();
    }

    /////////////////////////////////////////////////////////////////
    // Loads and stores

    fn ld8(&mut self, ea: u16) -> u8 {
        let res = self.mem.loadb(ea);
        self.logic8(res)
    }

    fn ld16(&mut self, ea: u16) -> u16 {
        let res = self.mem.loadw(ea);
        self.set_nz16(res);
        self.regs.cc.remove(CC_V);
        res
    }

    pub(crate) fn op_LDA(&mut self, ea: u16) {
        self.regs.a = self.ld8(ea);
    }

    pub(crate) fn op_LDB(&mut self, ea: u16) {
        self.regs.b = self.ld8(ea);
    }

    pub(crate) fn op_LDD(&mut self, ea: u16) {
        let res = self.ld16(ea);
        self.regs.set_d(res);
    }

    pub(crate) fn op_LDX(&mut self, ea: u16) {
        self.regs.x = self.ld16(ea);
    }

    pub(crate) fn op_LDY(&mut self, ea: u16) {
        self.regs.y = self.ld16(ea);
    }

    pub(crate) fn op_LDU(&mut self, ea: u16) {
        self.regs.u = self.ld16(ea);
    }

    pub(crate) fn op_LDS(&mut self, ea: u16) {
        let res = self.ld16(ea);
        self.set_s(res);
    }

    fn st8(&mut self, ea: u16, val: u8) {
        self.mem.storeb(ea, val);
        self.logic8(val);
    }

    fn st16(&mut self, ea: u16, val: u16) {
        self.mem.storew(ea, val);
        self.set_nz16(val);
        self.regs.cc.remove(CC_V);
    }

    pub(crate) fn op_STA(&mut self, ea: u16) {
        let val = self.regs.a;
        self.st8(ea, val);
    }

    pub(crate) fn op_STB(&mut self, ea: u16) {
        let val = self.regs.b;
        self.st8(ea, val);
    }

    pub(crate) fn op_STD(&mut self, ea: u16) {
        let val = self.regs.d();
        self.st16(ea, val);
    }

    pub(crate) fn op_STX(&mut self, ea: u16) {
        let val = self.regs.x;
        self.st16(ea, val);
    }

    pub(crate) fn op_STY(&mut self, ea: u16) {
        let val = self.regs.y;
        self.st16(ea, val);
    }

    pub(crate) fn op_STU(&mut self, ea: u16) {
        let val = self.regs.u;
        self.st16(ea, val);
    }

    pub(crate) fn op_STS(&mut self, ea: u16) {
        let val = self.regs.s;
        self.st16(ea, val);
    }

    pub(crate) fn op_LEAX(&mut self, ea: u16) {
        self.regs.x = ea;
        self.regs.cc.set(CC_Z, ea == 0);
    }

    pub(crate) fn op_LEAY(&mut self, ea: u16) {
        self.regs.y = ea;
        self.regs.cc.set(CC_Z, ea == 0);
    }

    pub(crate) fn op_LEAS(&mut self, ea: u16) {
        self.set_s(ea);
    }

    pub(crate) fn op_LEAU(&mut self, ea: u16) {
        self.regs.u = ea;
    }

    /////////////////////////////////////////////////////////////////
    // Branches and jumps

    fn cond_hi(&self) -> bool {
        !self.regs.cc.intersects(CC_C | CC_Z)
    }

    fn cond_ls(&self) -> bool {
        self.regs.cc.intersects(CC_C | CC_Z)
    }

    fn cond_hs(&self) -> bool {
        !self.regs.cc.contains(CC_C)
    }

    fn cond_lo(&self) -> bool {
        self.regs.cc.contains(CC_C)
    }

    fn cond_ne(&self) -> bool {
        !self.regs.cc.contains(CC_Z)
    }

    fn cond_eq(&self) -> bool {
        self.regs.cc.contains(CC_Z)
    }

    fn cond_vc(&self) -> bool {
        !self.regs.cc.contains(CC_V)
    }

    fn cond_vs(&self) -> bool {
        self.regs.cc.contains(CC_V)
    }

    fn cond_pl(&self) -> bool {
        !self.regs.cc.contains(CC_N)
    }

    fn cond_mi(&self) -> bool {
        self.regs.cc.contains(CC_N)
    }

    /// N XOR V: the signed result is, or would be, negative.
    fn cond_lt(&self) -> bool {
        self.regs.cc.contains(CC_N) != self.regs.cc.contains(CC_V)
    }

    fn cond_ge(&self) -> bool {
        !self.cond_lt()
    }

    fn cond_le(&self) -> bool {
        self.regs.cc.contains(CC_Z) || self.cond_lt()
    }

    fn cond_gt(&self) -> bool {
        !self.cond_le()
    }

    branches! {
        op_BHI, op_LBHI => cond_hi;
        op_BLS, op_LBLS => cond_ls;
        op_BHS, op_LBHS => cond_hs;
        op_BLO, op_LBLO => cond_lo;
        op_BNE, op_LBNE => cond_ne;
        op_BEQ, op_LBEQ => cond_eq;
        op_BVC, op_LBVC => cond_vc;
        op_BVS, op_LBVS => cond_vs;
        op_BPL, op_LBPL => cond_pl;
        op_BMI, op_LBMI => cond_mi;
        op_BGE, op_LBGE => cond_ge;
        op_BLT, op_LBLT => cond_lt;
        op_BGT, op_LBGT => cond_gt;
        op_BLE, op_LBLE => cond_le;
    }

    pub(crate) fn op_BRA(&mut self, ea: u16) {
        self.regs.pc = ea;
    }

    pub(crate) fn op_LBRA(&mut self, ea: u16) {
        self.regs.pc = ea;
    }

    /// Branch never. The offset is still consumed.
    pub(crate) fn op_BRN(&mut self, _ea: u16) {}

    pub(crate) fn op_LBRN(&mut self, _ea: u16) {}

    /// Push the return address and jump.
    fn call(&mut self, ea: u16) {
        let pc = self.regs.pc;
        self.pushw_s(pc);
        self.regs.pc = ea;
    }

    pub(crate) fn op_BSR(&mut self, ea: u16) {
        self.call(ea);
    }

    pub(crate) fn op_LBSR(&mut self, ea: u16) {
        self.call(ea);
    }

    pub(crate) fn op_JSR(&mut self, ea: u16) {
        self.call(ea);
    }

    pub(crate) fn op_JMP(&mut self, ea: u16) {
        self.regs.pc = ea;
    }

    pub(crate) fn op_RTS(&mut self) {
        self.regs.pc = self.popw_s();
    }

    /////////////////////////////////////////////////////////////////
    // Miscellaneous

    pub(crate) fn op_NOP(&mut self) {}

    /// Halt until an interrupt line is asserted.
    pub(crate) fn op_SYNC(&mut self) {
        self.wait = WaitState::Sync;
    }

    pub(crate) fn op_ORCC(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        self.regs.cc |= CCFlags::from_bits_retain(val);
    }

    pub(crate) fn op_ANDCC(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        self.regs.cc &= CCFlags::from_bits_retain(val);
    }

    /// Decimal adjust A after a BCD addition.
    ///
    /// The correction for each nibble is 6 or 0. The low nibble is
    /// corrected if H is set or it is above 9; the high nibble if C is
    /// set, it is above 9, or it is above 8 while the low nibble is
    /// above 9. C is set if it was already set or the correction
    /// carries out of bit seven.
    pub(crate) fn op_DAA(&mut self) {
        let a = self.regs.a;
        let lsn = a & 0x0f;
        let msn = (a >> 4) & 0x0f;
        let cc_c = self.regs.cc.contains(CC_C);
        let cc_h = self.regs.cc.contains(CC_H);

        let cf_lsn = if cc_h || lsn > 9 { 0x06 } else { 0x00 };
        let cf_msn = if cc_c || msn > 9 || (msn > 8 && lsn > 9) { 0x60 } else { 0x00 };
        let res = a as u16 + (cf_lsn | cf_msn) as u16;

        self.regs.a = res as u8;
        self.set_nz8(res as u8);
        self.regs.cc.remove(CC_V);
        self.regs.cc.set(CC_C, cc_c || res > 0xff);
    }

    /// Sign extend B into D.
    pub(crate) fn op_SEX(&mut self) {
        self.regs.a = if self.regs.b & 0x80 != 0 { 0xff } else { 0x00 };
        let d = self.regs.d();
        self.set_nz16(d);
    }

    /// Unsigned multiply A by B into D. C is bit seven of the result's
    /// low byte, so it rounds the high byte.
    pub(crate) fn op_MUL(&mut self) {
        let r = self.regs.a as u16 * self.regs.b as u16;
        self.regs.set_d(r);
        self.regs.cc.set(CC_Z, r == 0);
        self.regs.cc.set(CC_C, r & 0x80 != 0);
    }

    pub(crate) fn op_ABX(&mut self) {
        self.regs.x = self.regs.x.wrapping_add(self.regs.b as u16);
    }

    /////////////////////////////////////////////////////////////////
    // Register transfers

    /// Read a register named by a TFR/EXG postbyte nibble:
    ///
    /// ```text
    /// 0000 = A:B            1000 = A
    /// 0001 = X              1001 = B
    /// 0010 = Y              1010 = CCR
    /// 0011 = US             1011 = DPR
    /// 0100 = SP
    /// 0101 = PC
    /// ```
    ///
    /// An 8-bit register reads as `$FF` in the high byte, and an
    /// undefined code reads as `$FFFF`, so mixed size transfers
    /// behave like the real part.
    fn reg_load(&self, code: u8) -> u16 {
        match code {
            0x0 => self.regs.d(),
            0x1 => self.regs.x,
            0x2 => self.regs.y,
            0x3 => self.regs.u,
            0x4 => self.regs.s,
            0x5 => self.regs.pc,
            0x8 => 0xff00 | self.regs.a as u16,
            0x9 => 0xff00 | self.regs.b as u16,
            0xA => 0xff00 | self.regs.cc.bits() as u16,
            0xB => 0xff00 | self.regs.dp as u16,
            _   => 0xffff,
        }
    }

    /// Write a register named by a postbyte nibble. 8-bit registers
    /// take the low byte; writes to undefined codes are dropped.
    fn reg_store(&mut self, code: u8, val: u16) {
        match code {
            0x0 => self.regs.set_d(val),
            0x1 => self.regs.x = val,
            0x2 => self.regs.y = val,
            0x3 => self.regs.u = val,
            0x4 => self.set_s(val),
            0x5 => self.regs.pc = val,
            0x8 => self.regs.a = val as u8,
            0x9 => self.regs.b = val as u8,
            0xA => self.set_cc(val as u8),
            0xB => self.regs.dp = val as u8,
            _   => log::debug!("transfer to undefined register {:X} ignored", code),
        }
    }

    /// Exchanges data between two registers. Bits 7-4 of the postbyte
    /// name one register and bits 3-0 the other.
    pub(crate) fn op_EXG(&mut self, ea: u16) {
        let postbyte = self.mem.loadb(ea);
        let r1 = postbyte >> 4;
        let r2 = postbyte & 0x0f;

        let v1 = self.reg_load(r1);
        let v2 = self.reg_load(r2);
        self.reg_store(r1, v2);
        self.reg_store(r2, v1);
    }

    /// Transfers from the register in bits 7-4 of the postbyte to the
    /// register in bits 3-0.
    pub(crate) fn op_TFR(&mut self, ea: u16) {
        let postbyte = self.mem.loadb(ea);
        let val = self.reg_load(postbyte >> 4);
        self.reg_store(postbyte & 0x0f, val);
    }

    /////////////////////////////////////////////////////////////////
    // Stacks

    /// All, some, or none of the processor registers are pushed onto the
    /// hardware stack (with the exception of the hardware stack pointer
    /// itself). Each byte moved costs a cycle.
    pub(crate) fn op_PSHS(&mut self, ea: u16) {
        let postbyte = self.mem.loadb(ea);
        let regs = self.regs;
        let before = regs.s;

        if postbyte & (1 << 7) != 0 { self.pushw_s(regs.pc);        }
        if postbyte & (1 << 6) != 0 { self.pushw_s(regs.u);         }
        if postbyte & (1 << 5) != 0 { self.pushw_s(regs.y);         }
        if postbyte & (1 << 4) != 0 { self.pushw_s(regs.x);         }
        if postbyte & (1 << 3) != 0 { self.pushb_s(regs.dp);        }
        if postbyte & (1 << 2) != 0 { self.pushb_s(regs.b);         }
        if postbyte & (1 << 1) != 0 { self.pushb_s(regs.a);         }
        if postbyte & (1 << 0) != 0 { self.pushb_s(regs.cc.bits()); }

        self.extra_cycles += before.wrapping_sub(self.regs.s) as u32;
    }

    pub(crate) fn op_PULS(&mut self, ea: u16) {
        let postbyte = self.mem.loadb(ea);
        let before = self.regs.s;

        if postbyte & (1 << 0) != 0 { let v = self.popb_s(); self.set_cc(v); }
        if postbyte & (1 << 1) != 0 { self.regs.a  = self.popb_s(); }
        if postbyte & (1 << 2) != 0 { self.regs.b  = self.popb_s(); }
        if postbyte & (1 << 3) != 0 { self.regs.dp = self.popb_s(); }
        if postbyte & (1 << 4) != 0 { self.regs.x  = self.popw_s(); }
        if postbyte & (1 << 5) != 0 { self.regs.y  = self.popw_s(); }
        if postbyte & (1 << 6) != 0 { self.regs.u  = self.popw_s(); }
        if postbyte & (1 << 7) != 0 { self.regs.pc = self.popw_s(); }

        self.extra_cycles += self.regs.s.wrapping_sub(before) as u32;
    }

    /// Like PSHS, on the user stack. Bit 6 names S instead of U.
    pub(crate) fn op_PSHU(&mut self, ea: u16) {
        let postbyte = self.mem.loadb(ea);
        let regs = self.regs;
        let before = regs.u;

        if postbyte & (1 << 7) != 0 { self.pushw_u(regs.pc);        }
        if postbyte & (1 << 6) != 0 { self.pushw_u(regs.s);         }
        if postbyte & (1 << 5) != 0 { self.pushw_u(regs.y);         }
        if postbyte & (1 << 4) != 0 { self.pushw_u(regs.x);         }
        if postbyte & (1 << 3) != 0 { self.pushb_u(regs.dp);        }
        if postbyte & (1 << 2) != 0 { self.pushb_u(regs.b);         }
        if postbyte & (1 << 1) != 0 { self.pushb_u(regs.a);         }
        if postbyte & (1 << 0) != 0 { self.pushb_u(regs.cc.bits()); }

        self.extra_cycles += before.wrapping_sub(self.regs.u) as u32;
    }

    pub(crate) fn op_PULU(&mut self, ea: u16) {
        let postbyte = self.mem.loadb(ea);
        let before = self.regs.u;

        if postbyte & (1 << 0) != 0 { let v = self.popb_u(); self.set_cc(v); }
        if postbyte & (1 << 1) != 0 { self.regs.a  = self.popb_u(); }
        if postbyte & (1 << 2) != 0 { self.regs.b  = self.popb_u(); }
        if postbyte & (1 << 3) != 0 { self.regs.dp = self.popb_u(); }
        if postbyte & (1 << 4) != 0 { self.regs.x  = self.popw_u(); }
        if postbyte & (1 << 5) != 0 { self.regs.y  = self.popw_u(); }
        if postbyte & (1 << 6) != 0 { let v = self.popw_u(); self.set_s(v); }
        if postbyte & (1 << 7) != 0 { self.regs.pc = self.popw_u(); }

        self.extra_cycles += self.regs.u.wrapping_sub(before) as u32;
    }

    /////////////////////////////////////////////////////////////////
    // Interrupts

    /// The saved machine state is recovered from the hardware stack and
    /// control is returned to the interrupted program. If the recovered E
    /// (entire) bit is clear, only PC and CC were saved and only they are
    /// recovered.
    pub(crate) fn op_RTI(&mut self) {
        let cc = self.popb_s();
        self.set_cc(cc);

        if self.regs.cc.contains(CC_E) {
            self.regs.a  = self.popb_s();
            self.regs.b  = self.popb_s();
            self.regs.dp = self.popb_s();
            self.regs.x  = self.popw_s();
            self.regs.y  = self.popw_s();
            self.regs.u  = self.popw_s();
            self.extra_cycles += RTI_ENTIRE_CYCLES;
        }

        self.regs.pc = self.popw_s();
    }

    /// AND the immediate into CC, stack the entire state, then wait
    /// for an interrupt.
    pub(crate) fn op_CWAI(&mut self, ea: u16) {
        let val = self.mem.loadb(ea);
        self.regs.cc &= CCFlags::from_bits_retain(val);
        self.regs.cc.insert(CC_E);
        self.push_entire_state();
        self.wait = WaitState::Cwai;
    }

    /// Software interrupt through `vector`. The entire state is
    /// stacked with E set. If `mask` is true, I and F are set after
    /// stacking.
    fn swi(&mut self, vector: u16, mask: bool) {
        self.regs.cc.insert(CC_E);
        self.push_entire_state();

        if mask {
            self.regs.cc.insert(CC_I | CC_F);
        }

        self.regs.pc = self.mem.loadw(vector);
    }

    pub(crate) fn op_SWI(&mut self) {
        self.swi(VEC_SWI, true);
    }

    pub(crate) fn op_SWI2(&mut self) {
        self.swi(VEC_SWI2, false);
    }

    pub(crate) fn op_SWI3(&mut self) {
        self.swi(VEC_SWI3, false);
    }
}
