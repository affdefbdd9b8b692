//
// mmu_test.rs --- MMU unit tests.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use super::*;
use super::commands::*;
use super::registers::*;

// Allocate a plain chain through the command interface.
fn alloc(mmu: &mut Mmu, count: u16, template: NodeStatus) -> u16 {
    mmu.set_arg1(count);
    mmu.set_arg2(template.bits() as u16);
    assert_eq!(mmu.command(ALLOC), MmuError::None);
    mmu.arg1()
}

fn write_word(mmu: &mut Mmu, off: u16, val: u16) {
    mmu.write_register(off, (val >> 8) as u8);
    mmu.write_register(off + 1, val as u8);
}

fn read_word(mmu: &Mmu, off: u16) -> u16 {
    ((mmu.read_register(off) as u16) << 8) | mmu.read_register(off + 1) as u16
}

#[test]
fn alloc_free_round_trip() {
    let mut mmu = Mmu::new();
    let h = alloc(&mut mmu, 5, NodeStatus::empty());

    assert_eq!(mmu.blocks_free() as usize, POOL_NODES - 5);
    assert_eq!(mmu.blocks_allocated(), 5);
    assert_eq!(mmu.blocks_fragged(), 0);

    let nodes: Vec<u16> = mmu.chain(h).collect();
    assert_eq!(nodes, vec![h, h + 1, h + 2, h + 3, h + 4]);
    for idx in nodes.iter() {
        let n = mmu.node(*idx).unwrap();
        assert!(n.is_allocated());
        assert_eq!(n.root, Some(h));
    }
    assert_eq!(mmu.node(h).unwrap().prev, None);
    assert_eq!(mmu.node(h + 4).unwrap().next, None);

    mmu.set_arg1(h);
    assert_eq!(mmu.command(SIZE), MmuError::None);
    assert_eq!(mmu.arg2(), 5);

    assert_eq!(mmu.command(FREE), MmuError::None);
    assert_eq!(mmu.blocks_free() as usize, POOL_NODES);
    assert_eq!(mmu.blocks_allocated(), 0);
    assert!(nodes.iter().all(|i| !mmu.node(*i).unwrap().is_allocated()));

    // The handle is gone now.
    assert_eq!(mmu.command(FREE), MmuError::Handle);
}

#[test]
fn alloc_argument_checks() {
    let mut mmu = Mmu::new();

    mmu.set_arg1(0);
    assert_eq!(mmu.command(ALLOC), MmuError::Argument);
    mmu.set_arg1(MAX_CHAIN + 1);
    assert_eq!(mmu.command(ALLOC), MmuError::Argument);
    assert_eq!(mmu.blocks_allocated(), 0);

    // A good command clears the last error.
    mmu.set_arg1(MAX_CHAIN);
    assert_eq!(mmu.command(ALLOC), MmuError::None);
    assert_eq!(mmu.error(), MmuError::None);
    assert_eq!(mmu.chain_len(mmu.arg1()), Ok(MAX_CHAIN));
}

#[test]
fn exhaustion_keeps_partial_chain() {
    let mut mmu = Mmu::new();
    let mut pages = Vec::new();

    for _ in 0..204 {
        assert_eq!(mmu.command(PG_ALLOC), MmuError::None);
        pages.push(mmu.arg1());
    }
    assert_eq!(mmu.blocks_free(), 204);

    mmu.set_arg1(256);
    mmu.set_arg2(0);
    assert_eq!(mmu.command(ALLOC), MmuError::Alloc);
    assert_eq!(mmu.error(), MmuError::Alloc);
    assert_eq!(mmu.command, 0);

    let partial = mmu.arg1();
    assert_eq!(mmu.chain_len(partial), Ok(204));
    assert_eq!(mmu.blocks_free(), 0);
    assert_eq!(mmu.blocks_allocated() as usize, POOL_NODES);

    // Earlier chains are untouched.
    for p in pages.iter() {
        assert_eq!(mmu.chain_len(*p), Ok(PAGE_NODES));
    }

    mmu.set_arg1(1);
    assert_eq!(mmu.command(ALLOC), MmuError::OutOfMem);

    // Freeing the partial chain gives its nodes back.
    mmu.set_arg1(partial);
    assert_eq!(mmu.command(FREE), MmuError::None);
    assert_eq!(mmu.blocks_free(), 204);
}

#[test]
fn page_free_checks() {
    let mut mmu = Mmu::new();
    let plain = alloc(&mut mmu, 3, NodeStatus::empty());

    mmu.set_arg1(plain);
    assert_eq!(mmu.command(PG_FREE), MmuError::Page);

    mmu.set_arg1(plain + 1);
    assert_eq!(mmu.command(PG_FREE), MmuError::Free);

    assert_eq!(mmu.command(PG_ALLOC), MmuError::None);
    let page = mmu.arg1();
    assert!(mmu.node(page).unwrap().status.contains(NodeStatus::PAGED));
    assert_eq!(mmu.command(PG_FREE), MmuError::None);
    assert_eq!(mmu.blocks_allocated(), 3);
}

#[test]
fn readonly_and_locked_nodes() {
    let mut mmu = Mmu::new();

    let ro = alloc(&mut mmu, 2, NodeStatus::READONLY);
    assert!(!mmu.write_payload(ro + 1, 0, 0x11));

    let h = alloc(&mut mmu, 3, NodeStatus::empty());
    assert!(mmu.write_payload(h + 2, 4, 0x22));
    assert_eq!(mmu.node(h + 2).unwrap().payload[4], 0x22);

    // Locking the root protects every node of the chain.
    mmu.set_cursor(h).unwrap();
    assert_eq!(mmu.command(LOCK_NODE), MmuError::None);
    assert!(!mmu.write_payload(h + 2, 4, 0x33));
    assert_eq!(mmu.node(h + 2).unwrap().payload[4], 0x22);

    // Through the registers as well.
    mmu.set_cursor(h + 2).unwrap();
    mmu.write_register(PAYLOAD + 4, 0x44);
    assert_eq!(mmu.read_register(PAYLOAD + 4), 0x22);

    mmu.set_cursor(h).unwrap();
    assert_eq!(mmu.command(UNLOCK_NODE), MmuError::None);
    mmu.set_cursor(h + 2).unwrap();
    mmu.write_register(PAYLOAD + 4, 0x44);
    assert_eq!(mmu.read_register(PAYLOAD + 4), 0x44);
}

#[test]
fn payload_write_outside_the_pool() {
    let mut mmu = Mmu::new();

    assert!(!mmu.write_payload(SENTINEL, 0, 0x01));
    assert_eq!(mmu.error(), MmuError::Index);

    assert!(!mmu.write_payload(POOL_NODES as u16, 31, 0x02));
    assert_eq!(mmu.error(), MmuError::Index);
    assert_eq!(mmu.blocks_free() as usize, POOL_NODES);
}

#[test]
fn splice_at_root_moves_the_handle() {
    let mut mmu = Mmu::new();
    let h = alloc(&mut mmu, 3, NodeStatus::empty());
    mmu.select_bank(0, Some(h)).unwrap();

    mmu.set_cursor(h + 1).unwrap();
    assert_eq!(mmu.command(PUSH_FRONT), MmuError::None);

    let root = mmu.cursor();
    assert_eq!(root, h + 3);
    assert_eq!(mmu.arg1(), root);
    assert_eq!(mmu.bank(0), Some(root));
    assert_eq!(mmu.chain(root).collect::<Vec<u16>>(), vec![h + 3, h, h + 1, h + 2]);
    assert!(mmu.chain(root).all(|i| mmu.node(i).unwrap().root == Some(root)));
    assert_eq!(mmu.blocks_fragged(), 1);

    // The old handle no longer names a chain.
    mmu.set_arg1(h);
    assert_eq!(mmu.command(SIZE), MmuError::Handle);

    // Mapped chains cannot be freed.
    mmu.set_arg1(root);
    assert_eq!(mmu.command(FREE), MmuError::Mapping);
    assert_eq!(mmu.blocks_allocated(), 4);

    // Popping the front hands the chain back to the old root.
    assert_eq!(mmu.command(POP_FRONT), MmuError::None);
    assert_eq!(mmu.arg1(), h);
    assert_eq!(mmu.bank(0), Some(h));
    assert_eq!(mmu.cursor(), h);
    assert_eq!(mmu.blocks_fragged(), 0);
}

#[test]
fn last_node_of_mapped_chain_stays() {
    let mut mmu = Mmu::new();
    let h = alloc(&mut mmu, 1, NodeStatus::empty());
    mmu.select_bank(1, Some(h)).unwrap();

    mmu.set_cursor(h).unwrap();
    assert_eq!(mmu.command(DEL_NODE), MmuError::Mapping);
    assert!(mmu.node(h).unwrap().is_allocated());

    mmu.select_bank(1, None).unwrap();
    assert_eq!(mmu.command(DEL_NODE), MmuError::None);
    assert_eq!(mmu.blocks_allocated(), 0);
}

#[test]
fn inserted_nodes_inherit_flags() {
    let mut mmu = Mmu::new();
    assert_eq!(mmu.command(PG_ALLOC), MmuError::None);
    let page = mmu.arg1();

    mmu.set_cursor(page).unwrap();
    assert_eq!(mmu.command(PUSH_BACK), MmuError::None);
    let tail = mmu.cursor();
    assert!(mmu.node(tail).unwrap().status.contains(NodeStatus::PAGED));
    assert_eq!(mmu.chain_len(page), Ok(PAGE_NODES + 1));

    assert_eq!(mmu.command(POP_BACK), MmuError::None);
    assert_eq!(mmu.chain_len(page), Ok(PAGE_NODES));
}

#[test]
fn defrag_closes_gaps() {
    let mut mmu = Mmu::new();

    let a = alloc(&mut mmu, 2, NodeStatus::empty());    // 0, 1
    let b = alloc(&mut mmu, 1, NodeStatus::empty());    // 2
    mmu.set_cursor(a).unwrap();
    assert_eq!(mmu.command(PUSH_BACK), MmuError::None); // 3

    assert_eq!(mmu.chain(a).collect::<Vec<u16>>(), vec![0, 1, 3]);
    assert_eq!(mmu.blocks_fragged(), 1);
    assert!(mmu.node(1).unwrap().status.contains(NodeStatus::FRAGD));
    assert!(mmu.node(3).unwrap().status.contains(NodeStatus::FRAGD));
    mmu.write_payload(3, 0, 0x77);

    mmu.set_arg1(b);
    assert_eq!(mmu.command(FREE), MmuError::None);
    assert_eq!(mmu.command(DEFRAG), MmuError::None);

    assert_eq!(mmu.arg1(), 1);
    assert_eq!(mmu.blocks_fragged(), 0);
    assert_eq!(mmu.chain(a).collect::<Vec<u16>>(), vec![0, 1, 2]);
    assert_eq!(mmu.node(2).unwrap().payload[0], 0x77);
    assert!(!mmu.node(1).unwrap().status.contains(NodeStatus::FRAGD));
    assert!(!mmu.node(3).unwrap().is_allocated());
    assert_eq!(mmu.cursor(), 2);
}

#[test]
fn reset_command_frees_everything() {
    let mut mmu = Mmu::new();
    let h = alloc(&mut mmu, 10, NodeStatus::empty());
    mmu.select_bank(0, Some(h)).unwrap();

    assert_eq!(mmu.command(RESET), MmuError::None);
    assert_eq!(mmu.blocks_free() as usize, POOL_NODES);
    assert_eq!(mmu.bank(0), None);
}

#[test]
fn word_registers_commit_on_low_byte() {
    let mut mmu = Mmu::new();

    mmu.write_register(ARG_1, 0x12);
    assert_eq!(mmu.arg1(), 0);
    mmu.write_register(ARG_1 + 1, 0x34);
    assert_eq!(mmu.arg1(), 0x1234);
    assert_eq!(read_word(&mmu, ARG_1), 0x1234);

    assert_eq!(read_word(&mmu, BLOCKS_FREE) as usize, POOL_NODES);
    write_word(&mut mmu, BLOCKS_FREE, 0);
    assert_eq!(read_word(&mmu, BLOCKS_FREE) as usize, POOL_NODES);

    assert_eq!(read_word(&mmu, BANK_1_SELECT), SENTINEL);
    assert_eq!(read_word(&mmu, BANK_2_SELECT), SENTINEL);
}

#[test]
fn command_protocol() {
    let mut mmu = Mmu::new();

    write_word(&mut mmu, ARG_1, 3);
    write_word(&mut mmu, ARG_2, 0);
    mmu.write_register(COMMAND, ALLOC);
    assert_eq!(mmu.read_register(ERROR), MmuError::None.code());
    assert_eq!(mmu.read_register(COMMAND), 0);

    let h = read_word(&mmu, ARG_1);
    assert_eq!(read_word(&mmu, BLOCKS_ALLOCATED), 3);

    // Walk the chain with the cursor.
    write_word(&mut mmu, RAW_NODE, h);
    assert_eq!(read_word(&mmu, ROOT_NODE), h);
    assert_eq!(read_word(&mmu, PREV_NODE), SENTINEL);
    assert_eq!(read_word(&mmu, NEXT_NODE), h + 1);
    assert_eq!(mmu.read_register(NODE_STATUS), NodeStatus::ALLOCATED.bits());

    mmu.write_register(COMMAND, LOAD_LAST);
    assert_eq!(read_word(&mmu, RAW_NODE), h + 2);
    assert_eq!(read_word(&mmu, NEXT_NODE), SENTINEL);

    for i in 0..PAYLOAD_SIZE as u16 {
        mmu.write_register(PAYLOAD + i, 0xA0 + i as u8);
    }
    assert_eq!(mmu.node(h + 2).unwrap().payload[31], 0xA0 + 31);

    // Map it into bank 2.
    write_word(&mut mmu, BANK_2_SELECT, h);
    assert_eq!(mmu.bank(1), Some(h));
    assert_eq!(mmu.bank_read(1, 2 * PAYLOAD_SIZE as u16 + 5), Some(0xA5));

    mmu.write_register(COMMAND, 0x55);
    assert_eq!(mmu.read_register(ERROR), MmuError::Invalid.code());
    assert_eq!(mmu.read_register(COMMAND), 0);
}

#[test]
fn register_errors() {
    let mut mmu = Mmu::new();

    write_word(&mut mmu, RAW_NODE, POOL_NODES as u16);
    assert_eq!(mmu.error(), MmuError::Index);
    assert_eq!(mmu.cursor(), 0);

    // No node is allocated under the cursor yet.
    mmu.write_register(PAYLOAD, 0x01);
    assert_eq!(mmu.error(), MmuError::Node);
    mmu.write_register(COMMAND, LOAD_NEXT);
    assert_eq!(mmu.read_register(ERROR), MmuError::Node.code());

    write_word(&mut mmu, BANK_1_SELECT, 0x0100);
    assert_eq!(mmu.error(), MmuError::Bank);
    assert_eq!(mmu.bank(0), None);
}

#[test]
fn command_table_is_complete() {
    let codes: Vec<u8> = commands().iter().map(|c| c.code).collect();
    assert_eq!(codes, (NOP..=SIZE).collect::<Vec<u8>>());
    assert_eq!(commands()[DEFRAG as usize].name, "DEFRAG");
}

#[test]
fn self_tests_pass() {
    let results = Mmu::self_test();
    assert_eq!(results.len(), commands().len());
    for r in results.iter() {
        assert!(r.passed, "self test {} failed", r.name);
    }
}
