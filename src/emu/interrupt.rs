//
// interrupt.rs --- 6809 interrupt lines and wait states.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Interrupt handling.
//!
//! The three interrupt inputs are active low, as on the real part:
//! a line holding `false` is asserted. NMI is edge triggered and is
//! latched on the falling edge; FIRQ and IRQ are level sensitive and
//! are sampled every time the CPU is between instructions.

use crate::emu::cpu::CPU;
use crate::emu::mem::Mem;
use crate::emu::regs::{CC_E, CC_F, CC_I};

pub const VEC_NMI: u16 = 0xFFFC;
pub const VEC_SWI: u16 = 0xFFFA;
pub const VEC_IRQ: u16 = 0xFFF8;
pub const VEC_FIRQ: u16 = 0xFFF6;
pub const VEC_SWI2: u16 = 0xFFF4;
pub const VEC_SWI3: u16 = 0xFFF2;

const ENTIRE_ENTRY_CYCLES: u32 = 19;
const FAST_ENTRY_CYCLES: u32 = 10;
const WAKE_CYCLES: u32 = 7;

/// What the CPU is doing between instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitState {
    Normal,
    /// Halted by SYNC until any interrupt line is asserted.
    Sync,
    /// Halted by CWAI with the entire state already stacked.
    Cwai,
}

/// The interrupt input lines (`false` = asserted).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterruptLines {
    pub nmi: bool,
    pub firq: bool,
    pub irq: bool,
    nmi_prev: bool,
    nmi_pending: bool,
    /// Set at reset; cleared the first time S is loaded.
    pub nmi_disabled: bool,
}

impl InterruptLines {
    pub fn new() -> InterruptLines {
        InterruptLines {
            nmi: true,
            firq: true,
            irq: true,
            nmi_prev: true,
            nmi_pending: false,
            nmi_disabled: true,
        }
    }

    pub fn reset(&mut self) {
        *self = InterruptLines::new();
    }

    /// Drive the NMI line, latching a falling edge.
    pub fn drive_nmi(&mut self, line: bool) {
        if self.nmi_prev && !line && !self.nmi_disabled {
            self.nmi_pending = true;
        }
        self.nmi_prev = line;
        self.nmi = line;
    }

    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }
}

impl Default for InterruptLines {
    fn default() -> InterruptLines {
        InterruptLines::new()
    }
}

/// Which interrupt the CPU decided to take.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Source {
    Nmi,
    Firq,
    Irq,
}

impl <M: Mem> CPU<M> {
    /// Assert or release NMI.
    pub fn set_nmi(&mut self, asserted: bool) {
        self.lines.drive_nmi(!asserted);
    }

    /// Assert or release FIRQ.
    pub fn set_firq(&mut self, asserted: bool) {
        self.lines.firq = !asserted;
    }

    /// Assert or release IRQ.
    pub fn set_irq(&mut self, asserted: bool) {
        self.lines.irq = !asserted;
    }

    pub fn interrupt_lines(&self) -> &InterruptLines {
        &self.lines
    }

    /// Pick the highest priority interrupt that can be taken now.
    fn accepted_source(&self) -> Option<Source> {
        let cc = self.regs.cc;

        if self.lines.nmi_pending && !self.lines.nmi_disabled {
            Some(Source::Nmi)
        } else if !self.lines.firq && !cc.contains(CC_F) {
            Some(Source::Firq)
        } else if !self.lines.irq && !cc.contains(CC_I) {
            Some(Source::Irq)
        } else {
            None
        }
    }

    /// Return true if any line is asserted, masked or not.
    fn any_line_asserted(&self) -> bool {
        self.lines.nmi_pending || !self.lines.firq || !self.lines.irq
    }

    /// Check the interrupt lines at an instruction boundary. Returns
    /// the cycles used if an interrupt was taken (or a wait state
    /// consumed the cycle); `None` means go on and fetch.
    pub(crate) fn service_interrupts(&mut self) -> Option<u32> {
        match self.wait {
            WaitState::Normal => {
                let src = self.accepted_source()?;
                Some(self.enter_interrupt(src, true))
            },
            WaitState::Sync => {
                if !self.any_line_asserted() {
                    return None;
                }
                self.wait = WaitState::Normal;
                match self.accepted_source() {
                    Some(src) => Some(self.enter_interrupt(src, true)),
                    None => None,
                }
            },
            WaitState::Cwai => {
                let src = self.accepted_source()?;
                self.wait = WaitState::Normal;
                self.enter_interrupt(src, false);
                Some(WAKE_CYCLES)
            },
        }
    }

    /// Stack the machine state as needed and jump through the vector.
    fn enter_interrupt(&mut self, src: Source, stack: bool) -> u32 {
        log::debug!("{:?} taken at {:04X}", src, self.regs.pc);

        let (vector, cycles) = match src {
            Source::Nmi => {
                self.lines.nmi_pending = false;
                if stack {
                    self.regs.cc.insert(CC_E);
                    self.push_entire_state();
                }
                (VEC_NMI, ENTIRE_ENTRY_CYCLES)
            },
            Source::Irq => {
                if stack {
                    self.regs.cc.insert(CC_E);
                    self.push_entire_state();
                }
                (VEC_IRQ, ENTIRE_ENTRY_CYCLES)
            },
            Source::Firq => {
                if stack {
                    self.regs.cc.remove(CC_E);
                    let (pc, cc) = (self.regs.pc, self.regs.cc.bits());
                    self.pushw_s(pc);
                    self.pushb_s(cc);
                }
                (VEC_FIRQ, FAST_ENTRY_CYCLES)
            },
        };

        self.regs.cc.insert(CC_F | CC_I);
        self.regs.pc = self.mem.loadw(vector);
        cycles
    }
}
