//
// opcodes.rs --- 6809 instruction table.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The opcode table.
//!
//! Opcodes live in three pages: the single byte opcodes, and the
//! opcodes prefixed by `$10` and `$11`. The table has one slot per
//! opcode in each page; a `None` slot is an illegal instruction.
//!
//! Cycle counts are the base counts from the Motorola data sheet.
//! The indexed mode and a few operations add to them as they run.

use crate::emu::cpu::CPU;
use crate::emu::mem::Mem;

/// Prefix byte for page 2 opcodes.
pub const PAGE2: u8 = 0x10;

/// Prefix byte for page 3 opcodes.
pub const PAGE3: u8 = 0x11;

const PAGE_SIZE: usize = 0x100;
const TABLE_SIZE: usize = 3 * PAGE_SIZE;

/// Addressing modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Inherent,
    Imm8,
    Imm16,
    Direct,
    Extended,
    Indexed,
    Rel8,
    Rel16,
    /// A mode no real instruction uses, such as storing to an
    /// immediate operand.
    Invalid,
}

impl Mode {
    /// Bytes of operand following the opcode. For the indexed mode
    /// this is the minimum (just the postbyte). An invalid slot has
    /// no operand of its own; its table size comes from its group.
    pub fn operand_len(self) -> u8 {
        match self {
            Mode::Inherent | Mode::Invalid => 0,
            Mode::Imm8 | Mode::Direct | Mode::Indexed | Mode::Rel8 => 1,
            Mode::Imm16 | Mode::Extended | Mode::Rel16 => 2,
        }
    }
}

/// The operation an opcode performs.
pub enum Handler<M: Mem> {
    /// An operation with no memory operand.
    Inherent(fn(&mut CPU<M>)),
    /// An operation on the effective address of its operand.
    Operand(fn(&mut CPU<M>, u16)),
}

impl <M: Mem> Clone for Handler<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl <M: Mem> Copy for Handler<M> {}

/// One instruction table entry.
pub struct Opcode<M: Mem> {
    pub code: u16,
    pub mnemonic: &'static str,
    pub mode: Mode,
    pub cycles: u8,
    pub size: u8,
    pub(crate) handler: Handler<M>,
}

impl <M: Mem> Clone for Opcode<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl <M: Mem> Copy for Opcode<M> {}

impl <M: Mem> Opcode<M> {
    /// Length of the opcode itself, including any page prefix.
    pub fn opcode_len(&self) -> u8 {
        prefix_len(self.code)
    }
}

fn prefix_len(code: u16) -> u8 {
    if code > 0xff { 2 } else { 1 }
}

/// Return the table slot for an opcode, or `None` if the opcode is
/// not in one of the three pages.
pub fn slot(code: u16) -> Option<usize> {
    match code & 0xff00 {
        0x0000 => Some(code as usize),
        0x1000 => Some(PAGE_SIZE + (code & 0xff) as usize),
        0x1100 => Some(2 * PAGE_SIZE + (code & 0xff) as usize),
        _ => None,
    }
}

/// Collects table entries, filling in each entry's size.
struct Builder<M: Mem> {
    table: Vec<Option<Opcode<M>>>,
}

impl <M: Mem> Builder<M> {
    fn insert(&mut self, code: u16, mnemonic: &'static str, mode: Mode,
              cycles: u8, operand_len: u8, handler: Handler<M>) {
        let i = match slot(code) {
            Some(i) => i,
            None => return,
        };
        debug_assert!(self.table[i].is_none(), "duplicate opcode {:04X}", code);

        self.table[i] = Some(Opcode {
            code: code,
            mnemonic: mnemonic,
            mode: mode,
            cycles: cycles,
            size: prefix_len(code) + operand_len,
            handler: handler,
        });
    }

    fn inh(&mut self, code: u16, mnemonic: &'static str, cycles: u8,
           f: fn(&mut CPU<M>)) {
        self.insert(code, mnemonic, Mode::Inherent, cycles, 0, Handler::Inherent(f));
    }

    fn ea(&mut self, code: u16, mnemonic: &'static str, mode: Mode, cycles: u8,
          f: fn(&mut CPU<M>, u16)) {
        self.insert(code, mnemonic, mode, cycles, mode.operand_len(), Handler::Operand(f));
    }

    /// Memory read-modify-write group: direct at `code`, indexed at
    /// `code + $60`, extended at `code + $70`.
    fn rmw(&mut self, code: u16, mnemonic: &'static str, cycles: [u8; 3],
           f: fn(&mut CPU<M>, u16)) {
        self.ea(code, mnemonic, Mode::Direct, cycles[0], f);
        self.ea(code + 0x60, mnemonic, Mode::Indexed, cycles[1], f);
        self.ea(code + 0x70, mnemonic, Mode::Extended, cycles[2], f);
    }

    /// Accumulator group: immediate at `code`, then direct, indexed
    /// and extended at `$10` steps. `cycles` lists those four modes.
    fn acc(&mut self, code: u16, mnemonic: &'static str, imm: Mode, cycles: [u8; 4],
           f: fn(&mut CPU<M>, u16)) {
        self.ea(code, mnemonic, imm, cycles[0], f);
        self.ea(code + 0x10, mnemonic, Mode::Direct, cycles[1], f);
        self.ea(code + 0x20, mnemonic, Mode::Indexed, cycles[2], f);
        self.ea(code + 0x30, mnemonic, Mode::Extended, cycles[3], f);
    }

    /// Store group. The immediate slot exists in the encoding but
    /// has no meaning, so it faults. It is still sized as the `imm`
    /// operand the encoding implies.
    fn store(&mut self, code: u16, mnemonic: &'static str, imm: Mode, cycles: [u8; 3],
             f: fn(&mut CPU<M>, u16)) {
        self.insert(code, mnemonic, Mode::Invalid, 2, imm.operand_len(), Handler::Operand(f));
        self.ea(code + 0x10, mnemonic, Mode::Direct, cycles[0], f);
        self.ea(code + 0x20, mnemonic, Mode::Indexed, cycles[1], f);
        self.ea(code + 0x30, mnemonic, Mode::Extended, cycles[2], f);
    }
}

const RMW: [u8; 3] = [6, 6, 7];
const ACC8: [u8; 4] = [2, 4, 4, 5];
const ACC16: [u8; 4] = [4, 6, 6, 7];
const LD16: [u8; 4] = [3, 5, 5, 6];
const CMP16: [u8; 4] = [5, 7, 7, 8];
const LD16_PAGE2: [u8; 4] = [4, 6, 6, 7];
const ST8: [u8; 3] = [4, 4, 5];
const ST16: [u8; 3] = [5, 5, 6];
const ST16_PAGE2: [u8; 3] = [6, 6, 7];

/// Build the full instruction table.
pub fn build_table<M: Mem>() -> Vec<Option<Opcode<M>>> {
    let mut t = Builder { table: (0..TABLE_SIZE).map(|_| None).collect() };

    // Memory read-modify-write.
    t.rmw(0x00, "NEG", RMW, CPU::op_NEG);
    t.rmw(0x03, "COM", RMW, CPU::op_COM);
    t.rmw(0x04, "LSR", RMW, CPU::op_LSR);
    t.rmw(0x06, "ROR", RMW, CPU::op_ROR);
    t.rmw(0x07, "ASR", RMW, CPU::op_ASR);
    t.rmw(0x08, "LSL", RMW, CPU::op_LSL);
    t.rmw(0x09, "ROL", RMW, CPU::op_ROL);
    t.rmw(0x0A, "DEC", RMW, CPU::op_DEC);
    t.rmw(0x0C, "INC", RMW, CPU::op_INC);
    t.rmw(0x0D, "TST", RMW, CPU::op_TST);
    t.rmw(0x0E, "JMP", [3, 3, 4], CPU::op_JMP);
    t.rmw(0x0F, "CLR", RMW, CPU::op_CLR);

    // Miscellaneous.
    t.inh(0x12, "NOP", 2, CPU::op_NOP);
    t.inh(0x13, "SYNC", 4, CPU::op_SYNC);
    t.ea(0x16, "LBRA", Mode::Rel16, 5, CPU::op_LBRA);
    t.ea(0x17, "LBSR", Mode::Rel16, 9, CPU::op_LBSR);
    t.inh(0x19, "DAA", 2, CPU::op_DAA);
    t.ea(0x1A, "ORCC", Mode::Imm8, 3, CPU::op_ORCC);
    t.ea(0x1C, "ANDCC", Mode::Imm8, 3, CPU::op_ANDCC);
    t.inh(0x1D, "SEX", 2, CPU::op_SEX);
    t.ea(0x1E, "EXG", Mode::Imm8, 8, CPU::op_EXG);
    t.ea(0x1F, "TFR", Mode::Imm8, 6, CPU::op_TFR);

    // Short branches.
    t.ea(0x20, "BRA", Mode::Rel8, 3, CPU::op_BRA);
    t.ea(0x21, "BRN", Mode::Rel8, 3, CPU::op_BRN);
    t.ea(0x22, "BHI", Mode::Rel8, 3, CPU::op_BHI);
    t.ea(0x23, "BLS", Mode::Rel8, 3, CPU::op_BLS);
    t.ea(0x24, "BHS", Mode::Rel8, 3, CPU::op_BHS);
    t.ea(0x25, "BLO", Mode::Rel8, 3, CPU::op_BLO);
    t.ea(0x26, "BNE", Mode::Rel8, 3, CPU::op_BNE);
    t.ea(0x27, "BEQ", Mode::Rel8, 3, CPU::op_BEQ);
    t.ea(0x28, "BVC", Mode::Rel8, 3, CPU::op_BVC);
    t.ea(0x29, "BVS", Mode::Rel8, 3, CPU::op_BVS);
    t.ea(0x2A, "BPL", Mode::Rel8, 3, CPU::op_BPL);
    t.ea(0x2B, "BMI", Mode::Rel8, 3, CPU::op_BMI);
    t.ea(0x2C, "BGE", Mode::Rel8, 3, CPU::op_BGE);
    t.ea(0x2D, "BLT", Mode::Rel8, 3, CPU::op_BLT);
    t.ea(0x2E, "BGT", Mode::Rel8, 3, CPU::op_BGT);
    t.ea(0x2F, "BLE", Mode::Rel8, 3, CPU::op_BLE);

    // Stack, LEA and system instructions.
    t.ea(0x30, "LEAX", Mode::Indexed, 4, CPU::op_LEAX);
    t.ea(0x31, "LEAY", Mode::Indexed, 4, CPU::op_LEAY);
    t.ea(0x32, "LEAS", Mode::Indexed, 4, CPU::op_LEAS);
    t.ea(0x33, "LEAU", Mode::Indexed, 4, CPU::op_LEAU);
    t.ea(0x34, "PSHS", Mode::Imm8, 5, CPU::op_PSHS);
    t.ea(0x35, "PULS", Mode::Imm8, 5, CPU::op_PULS);
    t.ea(0x36, "PSHU", Mode::Imm8, 5, CPU::op_PSHU);
    t.ea(0x37, "PULU", Mode::Imm8, 5, CPU::op_PULU);
    t.inh(0x39, "RTS", 5, CPU::op_RTS);
    t.inh(0x3A, "ABX", 3, CPU::op_ABX);
    t.inh(0x3B, "RTI", 6, CPU::op_RTI);
    t.ea(0x3C, "CWAI", Mode::Imm8, 20, CPU::op_CWAI);
    t.inh(0x3D, "MUL", 11, CPU::op_MUL);
    t.inh(0x3F, "SWI", 19, CPU::op_SWI);

    // Accumulator A.
    t.inh(0x40, "NEGA", 2, CPU::op_NEGA);
    t.inh(0x43, "COMA", 2, CPU::op_COMA);
    t.inh(0x44, "LSRA", 2, CPU::op_LSRA);
    t.inh(0x46, "RORA", 2, CPU::op_RORA);
    t.inh(0x47, "ASRA", 2, CPU::op_ASRA);
    t.inh(0x48, "LSLA", 2, CPU::op_LSLA);
    t.inh(0x49, "ROLA", 2, CPU::op_ROLA);
    t.inh(0x4A, "DECA", 2, CPU::op_DECA);
    t.inh(0x4C, "INCA", 2, CPU::op_INCA);
    t.inh(0x4D, "TSTA", 2, CPU::op_TSTA);
    t.inh(0x4F, "CLRA", 2, CPU::op_CLRA);

    // Accumulator B.
    t.inh(0x50, "NEGB", 2, CPU::op_NEGB);
    t.inh(0x53, "COMB", 2, CPU::op_COMB);
    t.inh(0x54, "LSRB", 2, CPU::op_LSRB);
    t.inh(0x56, "RORB", 2, CPU::op_RORB);
    t.inh(0x57, "ASRB", 2, CPU::op_ASRB);
    t.inh(0x58, "LSLB", 2, CPU::op_LSLB);
    t.inh(0x59, "ROLB", 2, CPU::op_ROLB);
    t.inh(0x5A, "DECB", 2, CPU::op_DECB);
    t.inh(0x5C, "INCB", 2, CPU::op_INCB);
    t.inh(0x5D, "TSTB", 2, CPU::op_TSTB);
    t.inh(0x5F, "CLRB", 2, CPU::op_CLRB);

    // A register and 16-bit X/D operations, $80-$BF.
    t.acc(0x80, "SUBA", Mode::Imm8, ACC8, CPU::op_SUBA);
    t.acc(0x81, "CMPA", Mode::Imm8, ACC8, CPU::op_CMPA);
    t.acc(0x82, "SBCA", Mode::Imm8, ACC8, CPU::op_SBCA);
    t.acc(0x83, "SUBD", Mode::Imm16, ACC16, CPU::op_SUBD);
    t.acc(0x84, "ANDA", Mode::Imm8, ACC8, CPU::op_ANDA);
    t.acc(0x85, "BITA", Mode::Imm8, ACC8, CPU::op_BITA);
    t.acc(0x86, "LDA", Mode::Imm8, ACC8, CPU::op_LDA);
    t.store(0x87, "STA", Mode::Imm8, ST8, CPU::op_STA);
    t.acc(0x88, "EORA", Mode::Imm8, ACC8, CPU::op_EORA);
    t.acc(0x89, "ADCA", Mode::Imm8, ACC8, CPU::op_ADCA);
    t.acc(0x8A, "ORA", Mode::Imm8, ACC8, CPU::op_ORA);
    t.acc(0x8B, "ADDA", Mode::Imm8, ACC8, CPU::op_ADDA);
    t.acc(0x8C, "CMPX", Mode::Imm16, ACC16, CPU::op_CMPX);
    t.ea(0x8D, "BSR", Mode::Rel8, 7, CPU::op_BSR);
    t.ea(0x9D, "JSR", Mode::Direct, 7, CPU::op_JSR);
    t.ea(0xAD, "JSR", Mode::Indexed, 7, CPU::op_JSR);
    t.ea(0xBD, "JSR", Mode::Extended, 8, CPU::op_JSR);
    t.acc(0x8E, "LDX", Mode::Imm16, LD16, CPU::op_LDX);
    t.store(0x8F, "STX", Mode::Imm16, ST16, CPU::op_STX);

    // B register and 16-bit D/U operations, $C0-$FF.
    t.acc(0xC0, "SUBB", Mode::Imm8, ACC8, CPU::op_SUBB);
    t.acc(0xC1, "CMPB", Mode::Imm8, ACC8, CPU::op_CMPB);
    t.acc(0xC2, "SBCB", Mode::Imm8, ACC8, CPU::op_SBCB);
    t.acc(0xC3, "ADDD", Mode::Imm16, ACC16, CPU::op_ADDD);
    t.acc(0xC4, "ANDB", Mode::Imm8, ACC8, CPU::op_ANDB);
    t.acc(0xC5, "BITB", Mode::Imm8, ACC8, CPU::op_BITB);
    t.acc(0xC6, "LDB", Mode::Imm8, ACC8, CPU::op_LDB);
    t.store(0xC7, "STB", Mode::Imm8, ST8, CPU::op_STB);
    t.acc(0xC8, "EORB", Mode::Imm8, ACC8, CPU::op_EORB);
    t.acc(0xC9, "ADCB", Mode::Imm8, ACC8, CPU::op_ADCB);
    t.acc(0xCA, "ORB", Mode::Imm8, ACC8, CPU::op_ORB);
    t.acc(0xCB, "ADDB", Mode::Imm8, ACC8, CPU::op_ADDB);
    t.acc(0xCC, "LDD", Mode::Imm16, LD16, CPU::op_LDD);
    t.store(0xCD, "STD", Mode::Imm16, ST16, CPU::op_STD);
    t.acc(0xCE, "LDU", Mode::Imm16, LD16, CPU::op_LDU);
    t.store(0xCF, "STU", Mode::Imm16, ST16, CPU::op_STU);

    // Page 2.
    t.ea(0x1021, "LBRN", Mode::Rel16, 5, CPU::op_LBRN);
    t.ea(0x1022, "LBHI", Mode::Rel16, 5, CPU::op_LBHI);
    t.ea(0x1023, "LBLS", Mode::Rel16, 5, CPU::op_LBLS);
    t.ea(0x1024, "LBHS", Mode::Rel16, 5, CPU::op_LBHS);
    t.ea(0x1025, "LBLO", Mode::Rel16, 5, CPU::op_LBLO);
    t.ea(0x1026, "LBNE", Mode::Rel16, 5, CPU::op_LBNE);
    t.ea(0x1027, "LBEQ", Mode::Rel16, 5, CPU::op_LBEQ);
    t.ea(0x1028, "LBVC", Mode::Rel16, 5, CPU::op_LBVC);
    t.ea(0x1029, "LBVS", Mode::Rel16, 5, CPU::op_LBVS);
    t.ea(0x102A, "LBPL", Mode::Rel16, 5, CPU::op_LBPL);
    t.ea(0x102B, "LBMI", Mode::Rel16, 5, CPU::op_LBMI);
    t.ea(0x102C, "LBGE", Mode::Rel16, 5, CPU::op_LBGE);
    t.ea(0x102D, "LBLT", Mode::Rel16, 5, CPU::op_LBLT);
    t.ea(0x102E, "LBGT", Mode::Rel16, 5, CPU::op_LBGT);
    t.ea(0x102F, "LBLE", Mode::Rel16, 5, CPU::op_LBLE);
    t.inh(0x103F, "SWI2", 20, CPU::op_SWI2);
    t.acc(0x1083, "CMPD", Mode::Imm16, CMP16, CPU::op_CMPD);
    t.acc(0x108C, "CMPY", Mode::Imm16, CMP16, CPU::op_CMPY);
    t.acc(0x108E, "LDY", Mode::Imm16, LD16_PAGE2, CPU::op_LDY);
    t.store(0x108F, "STY", Mode::Imm16, ST16_PAGE2, CPU::op_STY);
    t.acc(0x10CE, "LDS", Mode::Imm16, LD16_PAGE2, CPU::op_LDS);
    t.store(0x10CF, "STS", Mode::Imm16, ST16_PAGE2, CPU::op_STS);

    // Page 3.
    t.inh(0x113F, "SWI3", 20, CPU::op_SWI3);
    t.acc(0x1183, "CMPU", Mode::Imm16, CMP16, CPU::op_CMPU);
    t.acc(0x118C, "CMPS", Mode::Imm16, CMP16, CPU::op_CMPS);

    t.table
}
