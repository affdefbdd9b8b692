//
// mod.rs --- 2MB linked-list memory management unit.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! The memory management unit.
//!
//! The MMU owns a 2MB pool carved into metadata nodes, each carrying
//! 32 bytes of payload and the links that string nodes together into
//! chains. A chain is named by its handle, the index of its root
//! node. The CPU drives the MMU through a block of registers (see
//! `registers.rs`) and sees chains through two 8K banked windows
//! (see `banked.rs`).
//!
//! ## Fragmentation
//!
//! Two linked nodes whose indices are not consecutive count as one
//! fragmentation break, and both ends carry the `FRAGD` flag. The pool
//! is a flat array, so this is only an approximation of physical
//! fragmentation; `DEFRAG` moves nodes to close such breaks.

use std::fmt;

pub mod node;
pub mod commands;
pub mod registers;

pub use self::node::{Node, NodeStatus, PAYLOAD_SIZE};
pub use self::commands::{Command, SelfTestResult};
pub use self::registers::MmuRegisters;

/// Nodes in the pool: 2MB over 32 payload bytes plus 8 bytes of links.
pub const POOL_NODES: usize = 52_428;

/// Nodes in one 8K page.
pub const PAGE_NODES: u16 = 256;

/// Largest chain a single ALLOC may build.
pub const MAX_CHAIN: u16 = 256;

/// The "no node" value seen through the registers.
pub const SENTINEL: u16 = 0xFFFF;

/// Number of banked windows.
pub const BANK_COUNT: usize = 2;

/// Bytes in one banked window.
pub const BANK_SIZE: usize = PAGE_NODES as usize * PAYLOAD_SIZE;

/// MMU error codes, as read from the ERROR register.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MmuError {
    None = 0,
    OutOfMem,
    Alloc,
    Free,
    Mapping,
    Unmapping,
    Invalid,
    Argument,
    Handle,
    Node,
    Page,
    Bank,
    Address,
    Offset,
    Length,
    Index,
    Unknown,
}

impl MmuError {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            MmuError::None      => "NONE",
            MmuError::OutOfMem  => "OUT_OF_MEM",
            MmuError::Alloc     => "ALLOC",
            MmuError::Free      => "FREE",
            MmuError::Mapping   => "MAPPING",
            MmuError::Unmapping => "UNMAPPING",
            MmuError::Invalid   => "INVALID",
            MmuError::Argument  => "ARGUMENT",
            MmuError::Handle    => "HANDLE",
            MmuError::Node      => "NODE",
            MmuError::Page      => "PAGE",
            MmuError::Bank      => "BANK",
            MmuError::Address   => "ADDRESS",
            MmuError::Offset    => "OFFSET",
            MmuError::Length    => "LENGTH",
            MmuError::Index     => "INDEX",
            MmuError::Unknown   => "UNKNOWN",
        }
    }
}

impl fmt::Display for MmuError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:02X})", self.name(), self.code())
    }
}

/// A failed allocation. `partial` names the chain built before the
/// pool ran out; it stays allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocError {
    pub code: MmuError,
    pub partial: Option<u16>,
}

/// Convert a link to its register form.
pub fn link_to_word(link: Option<u16>) -> u16 {
    link.unwrap_or(SENTINEL)
}

/// Convert a register word to a link.
pub fn word_to_link(word: u16) -> Option<u16> {
    if word == SENTINEL { None } else { Some(word) }
}

fn adjacent(a: u16, b: u16) -> bool {
    a as u32 + 1 == b as u32
}

/// The memory management unit.
pub struct Mmu {
    nodes: Vec<Node>,
    first_free: usize,      // no free node below this index
    blocks_free: u16,
    blocks_allocated: u16,
    blocks_fragged: u16,
    banks: [Option<u16>; BANK_COUNT],
    arg1: u16,
    arg2: u16,
    command: u8,
    error: MmuError,
    cursor: u16,
    latch: registers::WordLatch,
}

impl Mmu {
    pub fn new() -> Mmu {
        Mmu {
            nodes: vec![Node::new(); POOL_NODES],
            first_free: 0,
            blocks_free: POOL_NODES as u16,
            blocks_allocated: 0,
            blocks_fragged: 0,
            banks: [None; BANK_COUNT],
            arg1: 0,
            arg2: 0,
            command: 0,
            error: MmuError::None,
            cursor: 0,
            latch: registers::WordLatch::new(),
        }
    }

    /// Free every node and clear all registers.
    pub fn reset(&mut self) {
        for n in self.nodes.iter_mut() {
            n.clear();
        }
        self.first_free = 0;
        self.blocks_free = POOL_NODES as u16;
        self.blocks_allocated = 0;
        self.blocks_fragged = 0;
        self.banks = [None; BANK_COUNT];
        self.arg1 = 0;
        self.arg2 = 0;
        self.command = 0;
        self.error = MmuError::None;
        self.cursor = 0;
        self.latch = registers::WordLatch::new();
    }

    pub fn blocks_free(&self) -> u16 { self.blocks_free }
    pub fn blocks_allocated(&self) -> u16 { self.blocks_allocated }
    pub fn blocks_fragged(&self) -> u16 { self.blocks_fragged }

    pub fn arg1(&self) -> u16 { self.arg1 }
    pub fn set_arg1(&mut self, val: u16) { self.arg1 = val; }
    pub fn arg2(&self) -> u16 { self.arg2 }
    pub fn set_arg2(&mut self, val: u16) { self.arg2 = val; }

    /// The last error. Cleared by the next successful command.
    pub fn error(&self) -> MmuError {
        self.error
    }

    /// The node the payload and link registers expose.
    pub fn cursor(&self) -> u16 {
        self.cursor
    }

    pub fn set_cursor(&mut self, idx: u16) -> Result<(), MmuError> {
        if (idx as usize) < POOL_NODES {
            self.cursor = idx;
            Ok(())
        } else {
            Err(MmuError::Index)
        }
    }

    /// Return a node, or `None` if `idx` is outside the pool.
    pub fn node(&self, idx: u16) -> Option<&Node> {
        self.nodes.get(idx as usize)
    }

    /// The handle selected into a bank window, if any.
    pub fn bank(&self, bank: usize) -> Option<u16> {
        self.banks.get(bank).cloned().flatten()
    }

    /// Select a chain into a bank window, or unmap it with `None`.
    pub fn select_bank(&mut self, bank: usize, handle: Option<u16>) -> Result<(), MmuError> {
        if bank >= BANK_COUNT {
            return Err(MmuError::Bank);
        }
        if let Some(h) = handle {
            self.validate_handle(h).map_err(|_| MmuError::Bank)?;
        }
        self.banks[bank] = handle;
        Ok(())
    }

    /// True if `handle` is selected into either bank.
    pub fn is_mapped(&self, handle: u16) -> bool {
        self.banks.iter().any(|b| *b == Some(handle))
    }

    /// Iterate over the node indices of a chain starting at `start`.
    pub fn chain(&self, start: u16) -> Chain {
        let cur = match self.node(start) {
            Some(n) if n.is_allocated() => Some(start),
            _ => None,
        };
        Chain { mmu: self, cur: cur, limit: POOL_NODES }
    }

    /// Number of nodes in the chain named by `handle`.
    pub fn chain_len(&self, handle: u16) -> Result<u16, MmuError> {
        self.validate_handle(handle)?;
        Ok(self.chain(handle).count() as u16)
    }

    pub(crate) fn fail(&mut self, err: MmuError) {
        log::warn!("MMU error {}", err);
        self.error = err;
    }

    /////////////////////////////////////////////////////////////////
    // Pool management

    /// Check that `handle` names the root of an allocated chain.
    pub(crate) fn validate_handle(&self, handle: u16) -> Result<(), MmuError> {
        match self.node(handle) {
            Some(n) if n.is_allocated() && n.root == Some(handle) => Ok(()),
            _ => Err(MmuError::Handle),
        }
    }

    /// Check that the cursor sits on an allocated node.
    pub(crate) fn cursor_node(&self) -> Result<u16, MmuError> {
        match self.node(self.cursor) {
            Some(n) if n.is_allocated() => Ok(self.cursor),
            _ => Err(MmuError::Node),
        }
    }

    pub(crate) fn root_of(&self, idx: u16) -> u16 {
        self.node(idx).and_then(|n| n.root).unwrap_or(idx)
    }

    fn find_free(&mut self) -> Option<u16> {
        let pos = self.nodes[self.first_free..].iter().position(|n| !n.is_allocated())?;
        let idx = self.first_free + pos;
        self.first_free = idx + 1;
        Some(idx as u16)
    }

    fn claim(&mut self, idx: u16, template: NodeStatus, root: u16) {
        let node = &mut self.nodes[idx as usize];
        node.clear();
        node.status = template | NodeStatus::ALLOCATED;
        node.root = Some(root);

        self.blocks_free -= 1;
        self.blocks_allocated += 1;
    }

    /// Return an unlinked node to the pool.
    fn release(&mut self, idx: u16) {
        self.nodes[idx as usize].clear();
        self.blocks_free += 1;
        self.blocks_allocated -= 1;
        self.first_free = self.first_free.min(idx as usize);
    }

    /// Take a free node for a new chain member, or fail with
    /// OUT_OF_MEM.
    pub(crate) fn take_node(&mut self, template: NodeStatus, root: u16) -> Result<u16, MmuError> {
        let idx = self.find_free().ok_or(MmuError::OutOfMem)?;
        self.claim(idx, template, root);
        Ok(idx)
    }

    pub(crate) fn link(&mut self, a: u16, b: u16) {
        self.nodes[a as usize].next = Some(b);
        self.nodes[b as usize].prev = Some(a);
        if !adjacent(a, b) {
            self.blocks_fragged += 1;
        }
        self.refresh_frag(a);
        self.refresh_frag(b);
    }

    pub(crate) fn unlink(&mut self, a: u16, b: u16) {
        self.nodes[a as usize].next = None;
        self.nodes[b as usize].prev = None;
        if !adjacent(a, b) {
            self.blocks_fragged = self.blocks_fragged.saturating_sub(1);
        }
        self.refresh_frag(a);
        self.refresh_frag(b);
    }

    fn refresh_frag(&mut self, idx: u16) {
        let node = &mut self.nodes[idx as usize];
        let fragd = node.prev.map_or(false, |p| !adjacent(p, idx))
            || node.next.map_or(false, |n| !adjacent(idx, n));
        let live = node.is_allocated();
        node.status.set(NodeStatus::FRAGD, fragd && live);
    }

    /// Build a chain of `count` nodes with the given status flags.
    pub fn allocate(&mut self, count: u16, template: NodeStatus) -> Result<u16, AllocError> {
        if count == 0 || count > MAX_CHAIN {
            return Err(AllocError { code: MmuError::Argument, partial: None });
        }

        let root = match self.find_free() {
            Some(idx) => idx,
            None => return Err(AllocError { code: MmuError::OutOfMem, partial: None }),
        };
        self.claim(root, template, root);

        let mut tail = root;
        for built in 1..count {
            let idx = match self.find_free() {
                Some(idx) => idx,
                None => {
                    log::debug!("pool exhausted after {} of {} nodes", built, count);
                    return Err(AllocError { code: MmuError::Alloc, partial: Some(root) });
                }
            };
            self.claim(idx, template, root);
            self.link(tail, idx);
            tail = idx;
        }

        Ok(root)
    }

    /// Free a whole chain. Fails if the handle is not a chain root or
    /// is selected into a bank.
    pub fn free(&mut self, handle: u16) -> Result<u16, MmuError> {
        self.validate_handle(handle)?;
        if self.is_mapped(handle) {
            return Err(MmuError::Mapping);
        }
        Ok(self.release_chain(handle))
    }

    fn release_chain(&mut self, handle: u16) -> u16 {
        let mut count = 0;
        let mut cur = Some(handle);

        while let Some(idx) = cur {
            let next = self.nodes[idx as usize].next;
            if let Some(n) = next {
                self.unlink(idx, n);
            }
            self.release(idx);
            count += 1;
            cur = next;
        }

        count
    }

    /// Make `new_root` the head of its chain. Every node's root is
    /// rewritten, ARG_1 receives the new handle, and bank selects
    /// holding the old handle follow it.
    pub(crate) fn replace_root(&mut self, old_root: u16, new_root: u16) {
        let members: Vec<u16> = self.chain(new_root).collect();
        for idx in members {
            self.nodes[idx as usize].root = Some(new_root);
        }

        self.arg1 = new_root;
        for bank in self.banks.iter_mut() {
            if *bank == Some(old_root) {
                *bank = Some(new_root);
            }
        }
    }

    /// Unlink the cursor node from its chain and free it. The cursor
    /// moves to the next node, or the previous one at the tail.
    pub(crate) fn delete_node(&mut self, idx: u16) -> Result<(), MmuError> {
        let (prev, next, root) = {
            let n = &self.nodes[idx as usize];
            (n.prev, n.next, self.root_of(idx))
        };

        if prev.is_none() && next.is_none() && self.is_mapped(root) {
            return Err(MmuError::Mapping);
        }

        if let Some(p) = prev {
            self.unlink(p, idx);
        }
        if let Some(n) = next {
            self.unlink(idx, n);
        }
        if let (Some(p), Some(n)) = (prev, next) {
            self.link(p, n);
        }
        self.release(idx);

        if let (None, Some(n)) = (prev, next) {
            self.replace_root(root, n);
        }

        self.cursor = next.or(prev).unwrap_or(idx);
        Ok(())
    }

    /// Insert a new node before `idx` and move the cursor onto it.
    pub(crate) fn insert_before(&mut self, idx: u16) -> Result<(), MmuError> {
        let (prev, root, template) = self.splice_info(idx);
        let new = self.take_node(template, root)?;

        if let Some(p) = prev {
            self.unlink(p, idx);
            self.link(p, new);
        }
        self.link(new, idx);

        if prev.is_none() {
            self.replace_root(root, new);
        }

        self.cursor = new;
        Ok(())
    }

    /// Insert a new node after `idx` and move the cursor onto it.
    pub(crate) fn insert_after(&mut self, idx: u16) -> Result<(), MmuError> {
        let (_, root, template) = self.splice_info(idx);
        let next = self.nodes[idx as usize].next;
        let new = self.take_node(template, root)?;

        if let Some(n) = next {
            self.unlink(idx, n);
            self.link(new, n);
        }
        self.link(idx, new);

        self.cursor = new;
        Ok(())
    }

    /// Previous link, root and inherited status of a splice point.
    fn splice_info(&self, idx: u16) -> (Option<u16>, u16, NodeStatus) {
        let n = &self.nodes[idx as usize];
        let template = n.status & (NodeStatus::PAGED | NodeStatus::READONLY);
        (n.prev, self.root_of(idx), template)
    }

    /// Return the last node of the chain holding `idx`.
    pub(crate) fn last_of(&self, idx: u16) -> u16 {
        self.chain(idx).last().unwrap_or(idx)
    }

    /// Move nodes so each chain member sits right after its
    /// predecessor where that slot is free. Returns the number of
    /// nodes moved.
    pub(crate) fn defrag(&mut self) -> u16 {
        let mut moved = 0;

        for head in 0..POOL_NODES {
            let head = head as u16;
            let n = &self.nodes[head as usize];
            if !n.is_allocated() || n.root != Some(head) {
                continue;
            }

            let mut cur = head;
            while let Some(next) = self.nodes[cur as usize].next {
                let slot = cur as usize + 1;
                if !adjacent(cur, next) && slot < POOL_NODES && !self.nodes[slot].is_allocated() {
                    self.relocate(next, slot as u16);
                    moved += 1;
                    cur = slot as u16;
                } else {
                    cur = next;
                }
            }
        }

        moved
    }

    /// Move an allocated non-root node into the free slot `to`.
    fn relocate(&mut self, from: u16, to: u16) {
        let (prev, next) = {
            let n = &self.nodes[from as usize];
            (n.prev, n.next)
        };

        if let Some(p) = prev {
            self.unlink(p, from);
        }
        if let Some(n) = next {
            self.unlink(from, n);
        }

        let node = self.nodes[from as usize].clone();
        self.nodes[to as usize] = node;
        self.nodes[from as usize].clear();
        self.first_free = self.first_free.min(from as usize);

        if let Some(p) = prev {
            self.link(p, to);
        }
        if let Some(n) = next {
            self.link(to, n);
        }
        if self.cursor == from {
            self.cursor = to;
        }
    }

    /////////////////////////////////////////////////////////////////
    // Payload access

    /// Write one payload byte unless the node or its root is locked
    /// or read-only. Returns true if the byte was stored. An index
    /// outside the pool sets INDEX.
    pub fn write_payload(&mut self, idx: u16, offset: usize, val: u8) -> bool {
        let status = match self.node(idx) {
            Some(n) => n.status,
            None => {
                self.fail(MmuError::Index);
                return false;
            }
        };
        let root = self.root_of(idx);
        let protected = status.protected()
            || self.node(root).map_or(false, |n| n.status.protected());

        if protected {
            log::debug!("MMU: write to protected node {:04X} dropped", idx);
            return false;
        }

        self.nodes[idx as usize].payload[offset % PAYLOAD_SIZE] = val;
        true
    }

    /// Find the node and byte behind a bank window offset.
    fn bank_node(&self, handle: u16, offset: u16) -> Option<(u16, usize)> {
        let steps = offset as usize / PAYLOAD_SIZE;
        let mut cur = handle;
        for _ in 0..steps {
            cur = self.nodes[cur as usize].next?;
        }
        Some((cur, offset as usize % PAYLOAD_SIZE))
    }

    /// Read through a bank window. Returns `None` when the bank is
    /// unmapped so the caller can use its default RAM.
    pub fn bank_read(&mut self, bank: usize, offset: u16) -> Option<u8> {
        let handle = self.bank(bank)?;

        match self.bank_node(handle, offset) {
            Some((idx, byte)) => Some(self.nodes[idx as usize].payload[byte]),
            None => {
                self.fail(MmuError::Bank);
                Some(0)
            }
        }
    }

    /// Write through a bank window. Returns false when the bank is
    /// unmapped.
    pub fn bank_write(&mut self, bank: usize, offset: u16, val: u8) -> bool {
        let handle = match self.bank(bank) {
            Some(h) => h,
            None => return false,
        };

        match self.bank_node(handle, offset) {
            Some((idx, byte)) => { self.write_payload(idx, byte, val); },
            None => self.fail(MmuError::Bank),
        }
        true
    }
}

impl Default for Mmu {
    fn default() -> Mmu {
        Mmu::new()
    }
}

/// Iterator over the node indices of a chain.
pub struct Chain<'a> {
    mmu: &'a Mmu,
    cur: Option<u16>,
    limit: usize,
}

impl <'a> Iterator for Chain<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let idx = self.cur?;
        if self.limit == 0 {
            return None;
        }
        self.limit -= 1;
        self.cur = self.mmu.node(idx).and_then(|n| n.next);
        Some(idx)
    }
}

#[cfg(test)]
#[path = "mmu_test.rs"]
mod tests;
