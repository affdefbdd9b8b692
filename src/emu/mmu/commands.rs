//
// commands.rs --- MMU command table.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! MMU commands.
//!
//! Writing a code to the COMMAND register runs the matching entry of
//! the command table. A failing command leaves its code in the ERROR
//! register and the pool as it was; a successful one clears ERROR.
//! Every entry carries a self test that runs against a scratch MMU.

use crate::emu::mmu::{Mmu, MmuError, NodeStatus, PAGE_NODES, POOL_NODES};

pub const NOP: u8         = 0x00;
pub const PG_ALLOC: u8    = 0x01;
pub const PG_FREE: u8     = 0x02;
pub const ALLOC: u8       = 0x03;
pub const FREE: u8        = 0x04;
pub const LOAD_ROOT: u8   = 0x05;
pub const LOAD_NEXT: u8   = 0x06;
pub const LOAD_PREV: u8   = 0x07;
pub const LOAD_LAST: u8   = 0x08;
pub const DEL_NODE: u8    = 0x09;
pub const INS_BEFORE: u8  = 0x0A;
pub const INS_AFTER: u8   = 0x0B;
pub const PUSH_BACK: u8   = 0x0C;
pub const PUSH_FRONT: u8  = 0x0D;
pub const POP_BACK: u8    = 0x0E;
pub const POP_FRONT: u8   = 0x0F;
pub const LOCK_NODE: u8   = 0x10;
pub const UNLOCK_NODE: u8 = 0x11;
pub const DEFRAG: u8      = 0x12;
pub const RESET: u8       = 0x13;
pub const SIZE: u8        = 0x14;

type Handler = fn(&mut Mmu) -> Result<(), MmuError>;
type SelfTest = fn(&mut Mmu) -> bool;

/// One command table entry.
pub struct Command {
    pub code: u8,
    pub name: &'static str,
    handler: Handler,
    self_test: SelfTest,
}

/// The outcome of one command's self test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfTestResult {
    pub name: &'static str,
    pub passed: bool,
}

macro_rules! command_table {
    ($($code:ident => $handler:ident, $test:ident;)*) => {
        static COMMANDS: &[Command] = &[
            $(Command {
                code: $code,
                name: stringify!($code),
                handler: $handler,
                self_test: $test,
            },)*
        ];
    }
}

command_table! {
    NOP         => cmd_nop,         test_nop;
    PG_ALLOC    => cmd_pg_alloc,    test_pg_alloc;
    PG_FREE     => cmd_pg_free,     test_pg_free;
    ALLOC       => cmd_alloc,       test_alloc;
    FREE        => cmd_free,        test_free;
    LOAD_ROOT   => cmd_load_root,   test_load_root;
    LOAD_NEXT   => cmd_load_next,   test_load_next;
    LOAD_PREV   => cmd_load_prev,   test_load_prev;
    LOAD_LAST   => cmd_load_last,   test_load_last;
    DEL_NODE    => cmd_del_node,    test_del_node;
    INS_BEFORE  => cmd_ins_before,  test_ins_before;
    INS_AFTER   => cmd_ins_after,   test_ins_after;
    PUSH_BACK   => cmd_push_back,   test_push_back;
    PUSH_FRONT  => cmd_push_front,  test_push_front;
    POP_BACK    => cmd_pop_back,    test_pop_back;
    POP_FRONT   => cmd_pop_front,   test_pop_front;
    LOCK_NODE   => cmd_lock_node,   test_lock_node;
    UNLOCK_NODE => cmd_unlock_node, test_unlock_node;
    DEFRAG      => cmd_defrag,      test_defrag;
    RESET       => cmd_reset,       test_reset;
    SIZE        => cmd_size,        test_size;
}

/// Return the command table.
pub fn commands() -> &'static [Command] {
    COMMANDS
}

impl Mmu {
    /// Run a command and return the resulting error code.
    pub fn command(&mut self, code: u8) -> MmuError {
        self.command = code;

        let res = match COMMANDS.iter().find(|c| c.code == code) {
            Some(cmd) => {
                log::debug!("MMU command {} ARG_1={:04X} ARG_2={:04X} cursor={:04X}",
                            cmd.name, self.arg1, self.arg2, self.cursor);
                (cmd.handler)(self)
            },
            None => Err(MmuError::Invalid),
        };

        self.command = 0;
        match res {
            Ok(()) => self.error = MmuError::None,
            Err(err) => self.fail(err),
        }
        self.error
    }

    /// Run every command's self test, each on a fresh MMU.
    pub fn self_test() -> Vec<SelfTestResult> {
        COMMANDS.iter().map(|cmd| {
            let mut scratch = Mmu::new();
            let passed = (cmd.self_test)(&mut scratch);
            if passed {
                log::info!("MMU self test {}: ok", cmd.name);
            } else {
                log::warn!("MMU self test {}: FAILED", cmd.name);
            }
            SelfTestResult { name: cmd.name, passed: passed }
        }).collect()
    }

    /// Allocate a chain and publish its handle (or the partial chain
    /// left by exhaustion) in ARG_1.
    fn alloc_into_arg1(&mut self, count: u16, template: NodeStatus) -> Result<(), MmuError> {
        match self.allocate(count, template) {
            Ok(handle) => {
                self.arg1 = handle;
                Ok(())
            },
            Err(err) => {
                if let Some(partial) = err.partial {
                    self.arg1 = partial;
                }
                Err(err.code)
            },
        }
    }
}

/////////////////////////////////////////////////////////////////////
// Handlers

fn cmd_nop(_mmu: &mut Mmu) -> Result<(), MmuError> {
    Ok(())
}

fn cmd_pg_alloc(mmu: &mut Mmu) -> Result<(), MmuError> {
    mmu.alloc_into_arg1(PAGE_NODES, NodeStatus::PAGED)
}

fn cmd_pg_free(mmu: &mut Mmu) -> Result<(), MmuError> {
    let handle = mmu.arg1;
    mmu.validate_handle(handle).map_err(|_| MmuError::Free)?;

    let paged = mmu.nodes[handle as usize].status.contains(NodeStatus::PAGED);
    if !paged {
        return Err(MmuError::Page);
    }

    mmu.free(handle).map(|_| ())
}

fn cmd_alloc(mmu: &mut Mmu) -> Result<(), MmuError> {
    let count = mmu.arg1;
    let template = NodeStatus::template(mmu.arg2 as u8);
    mmu.alloc_into_arg1(count, template)
}

fn cmd_free(mmu: &mut Mmu) -> Result<(), MmuError> {
    let handle = mmu.arg1;
    mmu.free(handle).map(|_| ())
}

fn cmd_load_root(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.cursor = mmu.root_of(idx);
    Ok(())
}

fn cmd_load_next(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.cursor = mmu.nodes[idx as usize].next.ok_or(MmuError::Node)?;
    Ok(())
}

fn cmd_load_prev(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.cursor = mmu.nodes[idx as usize].prev.ok_or(MmuError::Node)?;
    Ok(())
}

fn cmd_load_last(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.cursor = mmu.last_of(idx);
    Ok(())
}

fn cmd_del_node(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.delete_node(idx)
}

fn cmd_ins_before(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.insert_before(idx)
}

fn cmd_ins_after(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.insert_after(idx)
}

fn cmd_push_back(mmu: &mut Mmu) -> Result<(), MmuError> {
    cmd_load_last(mmu)?;
    cmd_ins_after(mmu)
}

fn cmd_push_front(mmu: &mut Mmu) -> Result<(), MmuError> {
    cmd_load_root(mmu)?;
    cmd_ins_before(mmu)
}

fn cmd_pop_back(mmu: &mut Mmu) -> Result<(), MmuError> {
    cmd_load_last(mmu)?;
    cmd_del_node(mmu)
}

fn cmd_pop_front(mmu: &mut Mmu) -> Result<(), MmuError> {
    cmd_load_root(mmu)?;
    cmd_del_node(mmu)
}

fn cmd_lock_node(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.nodes[idx as usize].status.insert(NodeStatus::LOCKED);
    Ok(())
}

fn cmd_unlock_node(mmu: &mut Mmu) -> Result<(), MmuError> {
    let idx = mmu.cursor_node()?;
    mmu.nodes[idx as usize].status.remove(NodeStatus::LOCKED);
    Ok(())
}

fn cmd_defrag(mmu: &mut Mmu) -> Result<(), MmuError> {
    mmu.arg1 = mmu.defrag();
    Ok(())
}

fn cmd_reset(mmu: &mut Mmu) -> Result<(), MmuError> {
    mmu.reset();
    Ok(())
}

fn cmd_size(mmu: &mut Mmu) -> Result<(), MmuError> {
    let handle = mmu.arg1;
    mmu.arg2 = mmu.chain_len(handle)?;
    Ok(())
}

/////////////////////////////////////////////////////////////////////
// Self Tests

/// Allocate `count` plain nodes through the command interface.
fn alloc(mmu: &mut Mmu, count: u16) -> Option<u16> {
    mmu.arg1 = count;
    mmu.arg2 = 0;
    match mmu.command(ALLOC) {
        MmuError::None => Some(mmu.arg1),
        _ => None,
    }
}

/// Allocate `count` nodes and put the cursor on node `at` of the
/// chain.
fn alloc_at(mmu: &mut Mmu, count: u16, at: usize) -> Option<u16> {
    let handle = alloc(mmu, count)?;
    let idx = mmu.chain(handle).nth(at)?;
    mmu.cursor = idx;
    Some(handle)
}

fn test_nop(mmu: &mut Mmu) -> bool {
    mmu.command(NOP) == MmuError::None && mmu.blocks_free == POOL_NODES as u16
}

fn test_pg_alloc(mmu: &mut Mmu) -> bool {
    if mmu.command(PG_ALLOC) != MmuError::None {
        return false;
    }
    let handle = mmu.arg1;
    mmu.chain_len(handle) == Ok(PAGE_NODES)
        && mmu.chain(handle).all(|i| mmu.nodes[i as usize].status.contains(NodeStatus::PAGED))
}

fn test_pg_free(mmu: &mut Mmu) -> bool {
    if mmu.command(PG_ALLOC) != MmuError::None {
        return false;
    }
    let page = mmu.arg1;
    let plain = match alloc(mmu, 1) {
        Some(h) => h,
        None => return false,
    };

    mmu.arg1 = plain;
    let refused = mmu.command(PG_FREE) == MmuError::Page;
    mmu.arg1 = page;
    refused && mmu.command(PG_FREE) == MmuError::None && mmu.blocks_allocated == 1
}

fn test_alloc(mmu: &mut Mmu) -> bool {
    match alloc(mmu, 5) {
        Some(h) => mmu.chain(h).count() == 5 && mmu.blocks_allocated == 5,
        None => false,
    }
}

fn test_free(mmu: &mut Mmu) -> bool {
    let handle = match alloc(mmu, 5) {
        Some(h) => h,
        None => return false,
    };
    mmu.arg1 = handle;
    mmu.command(FREE) == MmuError::None
        && mmu.blocks_free == POOL_NODES as u16
        && mmu.blocks_allocated == 0
}

fn test_load_root(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 3, 2) {
        Some(h) => mmu.command(LOAD_ROOT) == MmuError::None && mmu.cursor == h,
        None => false,
    }
}

fn test_load_next(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 2, 0) {
        Some(h) => mmu.command(LOAD_NEXT) == MmuError::None
            && mmu.cursor == h + 1
            && mmu.command(LOAD_NEXT) == MmuError::Node,
        None => false,
    }
}

fn test_load_prev(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 2, 1) {
        Some(h) => mmu.command(LOAD_PREV) == MmuError::None
            && mmu.cursor == h
            && mmu.command(LOAD_PREV) == MmuError::Node,
        None => false,
    }
}

fn test_load_last(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 4, 0) {
        Some(h) => mmu.command(LOAD_LAST) == MmuError::None && mmu.cursor == h + 3,
        None => false,
    }
}

fn test_del_node(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 3, 1) {
        Some(h) => mmu.command(DEL_NODE) == MmuError::None
            && mmu.chain_len(h) == Ok(2)
            && mmu.cursor == h + 2,
        None => false,
    }
}

fn test_ins_before(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 2, 0) {
        Some(h) => mmu.command(INS_BEFORE) == MmuError::None
            && mmu.arg1 == mmu.cursor
            && mmu.chain(mmu.arg1).nth(1) == Some(h)
            && mmu.chain_len(mmu.arg1) == Ok(3),
        None => false,
    }
}

fn test_ins_after(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 2, 0) {
        Some(h) => mmu.command(INS_AFTER) == MmuError::None
            && mmu.chain(h).nth(1) == Some(mmu.cursor)
            && mmu.chain_len(h) == Ok(3),
        None => false,
    }
}

fn test_push_back(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 2, 0) {
        Some(h) => mmu.command(PUSH_BACK) == MmuError::None
            && mmu.chain(h).last() == Some(mmu.cursor)
            && mmu.chain_len(h) == Ok(3),
        None => false,
    }
}

fn test_push_front(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 2, 1) {
        Some(h) => mmu.command(PUSH_FRONT) == MmuError::None
            && mmu.arg1 == mmu.cursor
            && mmu.chain(mmu.arg1).nth(1) == Some(h),
        None => false,
    }
}

fn test_pop_back(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 3, 0) {
        Some(h) => mmu.command(POP_BACK) == MmuError::None
            && mmu.chain_len(h) == Ok(2)
            && mmu.blocks_allocated == 2,
        None => false,
    }
}

fn test_pop_front(mmu: &mut Mmu) -> bool {
    match alloc_at(mmu, 3, 2) {
        Some(h) => mmu.command(POP_FRONT) == MmuError::None
            && mmu.arg1 == h + 1
            && mmu.chain_len(h + 1) == Ok(2)
            && mmu.validate_handle(h).is_err(),
        None => false,
    }
}

fn test_lock_node(mmu: &mut Mmu) -> bool {
    let h = match alloc_at(mmu, 1, 0) {
        Some(h) => h,
        None => return false,
    };
    mmu.command(LOCK_NODE) == MmuError::None
        && !mmu.write_payload(h, 0, 0x55)
        && mmu.nodes[h as usize].payload[0] == 0
}

fn test_unlock_node(mmu: &mut Mmu) -> bool {
    let h = match alloc_at(mmu, 1, 0) {
        Some(h) => h,
        None => return false,
    };
    mmu.command(LOCK_NODE) == MmuError::None
        && mmu.command(UNLOCK_NODE) == MmuError::None
        && mmu.write_payload(h, 0, 0x55)
        && mmu.nodes[h as usize].payload[0] == 0x55
}

fn test_defrag(mmu: &mut Mmu) -> bool {
    // A at 0, B at 1, then a node inserted after A lands at 2.
    let a = match alloc_at(mmu, 1, 0) {
        Some(h) => h,
        None => return false,
    };
    let b = match alloc(mmu, 1) {
        Some(h) => h,
        None => return false,
    };
    mmu.cursor = a;
    if mmu.command(INS_AFTER) != MmuError::None || mmu.blocks_fragged != 1 {
        return false;
    }

    mmu.arg1 = b;
    mmu.command(FREE) == MmuError::None
        && mmu.command(DEFRAG) == MmuError::None
        && mmu.arg1 == 1
        && mmu.blocks_fragged == 0
        && mmu.chain(a).collect::<Vec<u16>>() == vec![a, a + 1]
}

fn test_reset(mmu: &mut Mmu) -> bool {
    if alloc(mmu, 10).is_none() {
        return false;
    }
    mmu.command(RESET) == MmuError::None
        && mmu.blocks_free == POOL_NODES as u16
        && mmu.blocks_allocated == 0
}

fn test_size(mmu: &mut Mmu) -> bool {
    let h = match alloc(mmu, 7) {
        Some(h) => h,
        None => return false,
    };
    mmu.arg1 = h;
    mmu.command(SIZE) == MmuError::None && mmu.arg2 == 7
}
