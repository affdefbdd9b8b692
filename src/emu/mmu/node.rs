//
// node.rs --- MMU metadata nodes.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use bitflags::bitflags;

/// Bytes of inline payload carried by each node.
pub const PAYLOAD_SIZE: usize = 32;

bitflags! {
    /// Status byte of a metadata node.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeStatus: u8 {
        const ALLOCATED = 0b00000001;
        /// Member of an 8K page.
        const PAGED     = 0b00000010;
        const READONLY  = 0b00000100;
        /// Linked to a neighbour that is not adjacent in the pool.
        const FRAGD     = 0b00001000;
        const LOCKED    = 0b00010000;
        const ERROR     = 0b10000000;
    }
}

impl NodeStatus {
    /// Flags a caller may ask for when allocating.
    pub fn template(bits: u8) -> NodeStatus {
        NodeStatus::from_bits_truncate(bits)
            & (NodeStatus::PAGED | NodeStatus::READONLY | NodeStatus::LOCKED)
    }

    /// True if the payload must not be written.
    pub fn protected(self) -> bool {
        self.intersects(NodeStatus::LOCKED | NodeStatus::READONLY)
    }
}

/// One 32-byte block of the pool and its chain links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub status: NodeStatus,
    pub payload: [u8; PAYLOAD_SIZE],
    pub root: Option<u16>,
    pub prev: Option<u16>,
    pub next: Option<u16>,
}

impl Node {
    pub fn new() -> Node {
        Node {
            status: NodeStatus::empty(),
            payload: [0; PAYLOAD_SIZE],
            root: None,
            prev: None,
            next: None,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.status.contains(NodeStatus::ALLOCATED)
    }

    /// Return the node to its free state.
    pub fn clear(&mut self) {
        *self = Node::new();
    }
}

impl Default for Node {
    fn default() -> Node {
        Node::new()
    }
}
