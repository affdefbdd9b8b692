//
// mod.rs --- SBC09 emulator module.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

#[macro_use]
pub mod fatal;

pub mod error;
pub mod mem;
pub mod regs;
pub mod interrupt;
pub mod cpu;
pub mod addressing;
pub mod ops;
pub mod opcodes;
pub mod bus;
pub mod mmu;
pub mod banked;
pub mod clock;
pub mod loader;
pub mod board;

pub use self::mem::{Mem, RAM, ROM};
pub use self::regs::{CCFlags, Regs, RegisterFile};
pub use self::cpu::{CPU, VisitedMap};
pub use self::bus::{Bus, Device, DeviceKind, Event};
pub use self::mmu::{Mmu, MmuError};
pub use self::board::Board;
pub use self::fatal::RunFlag;
pub use self::error::{Error, Result};
