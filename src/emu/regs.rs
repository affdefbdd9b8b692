//
// regs.rs --- 6809 register set.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The 6809 register set and its shared, thread-safe view.
//!
//! The CPU works on a private `Regs` value. At every instruction
//! boundary it publishes that value into a `RegisterFile`, where a
//! debugger or display thread can read any field. Writes made through
//! the `RegisterFile` are picked up by the CPU before it starts its
//! next instruction.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bitflags::bitflags;

bitflags! {
    /// The 6809's 8-bit flags register.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CCFlags: u8 {
        const E = 0b10000000;
        const F = 0b01000000;
        const H = 0b00100000;
        const I = 0b00010000;
        const N = 0b00001000;
        const Z = 0b00000100;
        const V = 0b00000010;
        const C = 0b00000001;
    }
}

pub const CC_E: CCFlags = CCFlags::E;
pub const CC_F: CCFlags = CCFlags::F;
pub const CC_H: CCFlags = CCFlags::H;
pub const CC_I: CCFlags = CCFlags::I;
pub const CC_N: CCFlags = CCFlags::N;
pub const CC_Z: CCFlags = CCFlags::Z;
pub const CC_V: CCFlags = CCFlags::V;
pub const CC_C: CCFlags = CCFlags::C;

impl fmt::Display for CCFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}{}{}{}{}{}",
               if self.contains(CC_E) { "E" } else { "" },
               if self.contains(CC_F) { "F" } else { "" },
               if self.contains(CC_H) { "H" } else { "" },
               if self.contains(CC_I) { "I" } else { "" },
               if self.contains(CC_N) { "N" } else { "" },
               if self.contains(CC_Z) { "Z" } else { "" },
               if self.contains(CC_V) { "V" } else { "" },
               if self.contains(CC_C) { "C" } else { "" })
    }
}

/// The set of 6809 CPU registers.
///
/// `A` and `B` are the only storage for the accumulators; `D` is
/// always computed from them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Regs {
    pub a: u8,
    pub b: u8,
    pub x: u16,
    pub y: u16,
    pub u: u16,
    pub s: u16,
    pub pc: u16,
    pub dp: u8,
    pub cc: CCFlags,
}

impl Regs {
    /// Create registers in their power-on state.
    pub fn new() -> Regs {
        Regs {
            a: 0,
            b: 0,
            x: 0,
            y: 0,
            u: 0,
            s: 0,
            pc: 0,
            dp: 0,
            cc: CCFlags::empty(),
        }
    }

    /// Return the value of `A` and `B` combined as the `D` register.
    pub fn d(&self) -> u16 {
        let hi = self.a as u16;
        let lo = self.b as u16;
        (hi << 8) | lo
    }

    /// Set `A` and `B` as the `D` register to a 16-bit value.
    pub fn set_d(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.b = val as u8;
    }
}

impl fmt::Display for Regs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "A={:02X} B={:02X} X={:04X} Y={:04X} U={:04X} S={:04X} \
                   PC={:04X} DP={:02X} CC={:02X} ({})",
               self.a, self.b, self.x, self.y, self.u, self.s,
               self.pc, self.dp, self.cc.bits(), self.cc)
    }
}

/////////////////////////////////////////////////////////////////////
// Shared Register File

/// Register writes made through a `RegisterFile` that the CPU has
/// not taken yet. Only the fields that were written are applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pending {
    pub pc: Option<u16>,
    pub s: Option<u16>,
    pub u: Option<u16>,
    pub x: Option<u16>,
    pub y: Option<u16>,
    pub dp: Option<u8>,
    pub a: Option<u8>,
    pub b: Option<u8>,
    cc_set: CCFlags,
    cc_clear: CCFlags,
}

impl Pending {
    fn is_empty(&self) -> bool {
        *self == Pending::default()
    }

    /// Overlay the written fields onto `regs`.
    pub fn apply(&self, regs: &mut Regs) {
        if let Some(v) = self.pc { regs.pc = v; }
        if let Some(v) = self.s  { regs.s = v; }
        if let Some(v) = self.u  { regs.u = v; }
        if let Some(v) = self.x  { regs.x = v; }
        if let Some(v) = self.y  { regs.y = v; }
        if let Some(v) = self.dp { regs.dp = v; }
        if let Some(v) = self.a  { regs.a = v; }
        if let Some(v) = self.b  { regs.b = v; }
        regs.cc = regs.cc.difference(self.cc_clear).union(self.cc_set);
    }

    fn set_flags(&mut self, flags: CCFlags, on: bool) {
        if on {
            self.cc_set.insert(flags);
            self.cc_clear.remove(flags);
        } else {
            self.cc_clear.insert(flags);
            self.cc_set.remove(flags);
        }
    }
}

#[derive(Debug, Default)]
struct Published {
    regs: Regs,
    pending: Pending,
}

/// A shared handle on the CPU's published registers.
///
/// Reads see the registers as of the last instruction boundary with
/// any writes not yet taken by the CPU laid over them. Each setter
/// touches only its own field.
#[derive(Clone, Debug, Default)]
pub struct RegisterFile {
    inner: Arc<Mutex<Published>>,
}

macro_rules! reg_accessors {
    ($($field:ident, $setter:ident: $ty:ty;)*) => {
        $(
            pub fn $field(&self) -> $ty {
                self.lock().regs.$field
            }

            pub fn $setter(&self, val: $ty) {
                let mut p = self.lock();
                p.regs.$field = val;
                p.pending.$field = Some(val);
            }
        )*
    }
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    fn lock(&self) -> MutexGuard<Published> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    reg_accessors! {
        pc, set_pc: u16;
        s, set_s: u16;
        u, set_u: u16;
        x, set_x: u16;
        y, set_y: u16;
        dp, set_dp: u8;
        a, set_a: u8;
        b, set_b: u8;
    }

    pub fn cc(&self) -> CCFlags {
        self.lock().regs.cc
    }

    pub fn set_cc(&self, val: CCFlags) {
        let mut p = self.lock();
        p.regs.cc = val;
        p.pending.set_flags(CCFlags::all(), false);
        p.pending.set_flags(val, true);
    }

    pub fn d(&self) -> u16 {
        self.lock().regs.d()
    }

    pub fn set_d(&self, val: u16) {
        let mut p = self.lock();
        p.regs.set_d(val);
        p.pending.a = Some((val >> 8) as u8);
        p.pending.b = Some(val as u8);
    }

    /// Return true if every bit of `flag` is set in CC.
    pub fn flag(&self, flag: CCFlags) -> bool {
        self.lock().regs.cc.contains(flag)
    }

    pub fn set_flag(&self, flag: CCFlags, on: bool) {
        let mut p = self.lock();
        p.regs.cc.set(flag, on);
        p.pending.set_flags(flag, on);
    }

    /// Return a copy of the whole register set.
    pub fn snapshot(&self) -> Regs {
        self.lock().regs
    }

    /// Publish the CPU's registers, keeping any field written from
    /// outside that the CPU has not taken yet.
    pub(crate) fn publish(&self, regs: &Regs) {
        let mut p = self.lock();
        let mut merged = *regs;
        p.pending.apply(&mut merged);
        p.regs = merged;
    }

    /// Take the writes made from outside the CPU since it last
    /// looked.
    pub(crate) fn take_pending(&self) -> Option<Pending> {
        let mut p = self.lock();
        if p.pending.is_empty() {
            None
        } else {
            Some(mem::take(&mut p.pending))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d_aliases_a_and_b() {
        let mut regs = Regs::new();

        regs.set_d(0x1234);
        assert_eq!(regs.a, 0x12);
        assert_eq!(regs.b, 0x34);

        regs.b = 0xFF;
        assert_eq!(regs.d(), 0x12FF);

        regs.a = 0x00;
        assert_eq!(regs.d(), 0x00FF);
    }

    #[test]
    fn register_file_pending_writes() {
        let rf = RegisterFile::new();
        let mut regs = Regs::new();
        regs.pc = 0x1000;

        rf.publish(&regs);
        assert_eq!(rf.pc(), 0x1000);
        assert!(rf.take_pending().is_none());

        let observer = rf.clone();
        observer.set_x(0xBEEF);
        observer.set_flag(CC_Z, true);

        // The CPU moves on; the untaken write survives its publish.
        regs.pc = 0x1002;
        regs.a = 0x42;
        rf.publish(&regs);
        assert_eq!(rf.x(), 0xBEEF);
        assert_eq!(rf.pc(), 0x1002);
        assert_eq!(rf.a(), 0x42);

        let pending = rf.take_pending().unwrap();
        assert_eq!(pending.x, Some(0xBEEF));
        assert_eq!(pending.pc, None);
        assert!(rf.take_pending().is_none());

        pending.apply(&mut regs);
        assert_eq!(regs.x, 0xBEEF);
        assert_eq!(regs.pc, 0x1002);
        assert_eq!(regs.a, 0x42);
        assert!(regs.cc.contains(CC_Z));
    }

    #[test]
    fn pending_flags_touch_only_their_bits() {
        let rf = RegisterFile::new();
        let mut regs = Regs::new();
        regs.cc = CC_E | CC_C;

        rf.set_flag(CC_C, false);
        rf.set_flag(CC_N, true);
        rf.set_d(0x1234);
        rf.take_pending().unwrap().apply(&mut regs);

        assert_eq!(regs.cc, CC_E | CC_N);
        assert_eq!(regs.d(), 0x1234);

        rf.set_cc(CC_I);
        rf.take_pending().unwrap().apply(&mut regs);
        assert_eq!(regs.cc, CC_I);
    }

    #[test]
    fn cc_display() {
        assert_eq!(format!("{}", CC_E | CC_I | CC_C), "EIC");
    }
}
