//
// interrupt_test.rs --- Interrupt and wait state tests.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use super::*;
use crate::emu::interrupt::*;
use crate::emu::mem::{Mem, RAM};
use crate::emu::regs::*;

const NMI_HANDLER: u16 = 0xE000;
const IRQ_HANDLER: u16 = 0xE100;
const FIRQ_HANDLER: u16 = 0xE200;
const SWI_HANDLER: u16 = 0xE300;
const SWI2_HANDLER: u16 = 0xE400;

// A CPU with every vector pointing at an RTI, reset into a program
// at $0100 that loads S and unmasks interrupts.
fn test_cpu() -> CPU<RAM> {
    let mut cpu = CPU::new(RAM::new(0x10000));

    cpu.mem.storew(VEC_RESET, 0x0100);
    cpu.mem.storew(VEC_NMI, NMI_HANDLER);
    cpu.mem.storew(VEC_IRQ, IRQ_HANDLER);
    cpu.mem.storew(VEC_FIRQ, FIRQ_HANDLER);
    cpu.mem.storew(VEC_SWI, SWI_HANDLER);
    cpu.mem.storew(VEC_SWI2, SWI2_HANDLER);
    for h in [NMI_HANDLER, IRQ_HANDLER, FIRQ_HANDLER, SWI_HANDLER, SWI2_HANDLER].iter() {
        cpu.mem.store(*h, &[0x3B]);             //      rti
    }

    cpu.mem.store(0x0100, &[                    //      org $100
        0x10, 0xCE, 0x04, 0x00,                 //      lds #$0400
        0x1C, 0xAF,                             //      andcc #$AF
        0x12,                                   //      nop
        0x12,                                   //      nop
    ]);

    cpu.reset();
    cpu
}

#[test]
fn reset_state() {
    let mut cpu = CPU::new(RAM::new(0x10000));
    cpu.mem.storew(VEC_RESET, 0x1234);
    cpu.regs.dp = 0x55;

    cpu.reset();

    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.regs.dp, 0x00);
    assert_flags! { cpu => CC_I: true, CC_F: true }
    assert!(cpu.interrupt_lines().nmi_disabled);
    assert_eq!(cpu.wait_state(), WaitState::Normal);
}

#[test]
fn nmi_ignored_until_s_is_loaded() {
    let mut cpu = test_cpu();

    cpu.set_nmi(true);
    assert!(!cpu.interrupt_lines().nmi_pending());
    cpu.set_nmi(false);

    cpu.step().unwrap();                        // lds
    assert_eq!(cpu.regs.pc, 0x0104);
    assert!(!cpu.interrupt_lines().nmi_disabled);

    cpu.set_nmi(true);
    assert!(cpu.interrupt_lines().nmi_pending());

    assert_eq!(cpu.step().unwrap(), 19);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert_eq!(cpu.regs.s, 0x0400 - 12);
    assert!(CCFlags::from_bits_retain(cpu.mem.loadb(cpu.regs.s)).contains(CC_E));
    assert_eq!(cpu.mem.loadw(cpu.regs.s + 10), 0x0104);
    assert_flags! { cpu => CC_I: true, CC_F: true }

    // Edge triggered: holding the line does not retrigger.
    assert_eq!(cpu.step().unwrap(), 15);        // rti
    assert_eq!(cpu.regs.pc, 0x0104);
    assert_eq!(cpu.regs.s, 0x0400);
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x0106);
}

#[test]
fn s_written_from_outside_arms_nmi() {
    let mut cpu = test_cpu();
    let rf = cpu.register_file();
    cpu.regs.pc = 0x0106;                       // skip the lds

    rf.set_s(0x0300);
    cpu.step().unwrap();                        // nop
    assert_eq!(cpu.regs.s, 0x0300);
    assert_eq!(cpu.regs.pc, 0x0107);
    assert!(!cpu.interrupt_lines().nmi_disabled);

    cpu.set_nmi(true);
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert_eq!(cpu.regs.s, 0x0300 - 12);
}

#[test]
fn nmi_beats_irq() {
    let mut cpu = test_cpu();
    cpu.step_n(2).unwrap();                     // lds; andcc

    cpu.set_irq(true);
    cpu.set_nmi(true);

    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert!(!cpu.interrupt_lines().irq);

    // RTI unmasks again and the IRQ still waiting is taken.
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x0106);
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_eq!(cpu.mem.loadw(cpu.regs.s + 10), 0x0106);
}

#[test]
fn masked_irq_waits() {
    let mut cpu = test_cpu();
    cpu.step().unwrap();                        // lds, I still set

    cpu.set_irq(true);
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x0106);            // andcc ran

    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_flags! { cpu => CC_I: true, CC_F: true, CC_E: true }
}

#[test]
fn firq_stacks_short_frame() {
    let mut cpu = test_cpu();
    cpu.step_n(2).unwrap();
    cpu.regs.a = 0x77;

    cpu.set_firq(true);
    assert_eq!(cpu.step().unwrap(), 10);
    assert_eq!(cpu.regs.pc, FIRQ_HANDLER);
    assert_eq!(cpu.regs.s, 0x0400 - 3);

    let stacked = CCFlags::from_bits_retain(cpu.mem.loadb(cpu.regs.s));
    assert!(!stacked.contains(CC_E));
    assert_eq!(cpu.mem.loadw(cpu.regs.s + 1), 0x0106);

    cpu.set_firq(false);
    cpu.regs.a = 0x00;
    assert_eq!(cpu.step().unwrap(), 6);         // rti
    assert_eq!(cpu.regs.pc, 0x0106);
    assert_eq!(cpu.regs.s, 0x0400);
    assert_eq!(cpu.regs.a, 0x00);
    assert_flags! { cpu => CC_F: false, CC_I: false }
}

#[test]
fn sync_resumes_on_masked_interrupt() {
    let mut cpu = test_cpu();
    cpu.mem.store(0x0106, &[                    //      org $106
        0x1A, 0x50,                             //      orcc #$50
        0x13,                                   //      sync
        0x4C,                                   //      inca
    ]);
    cpu.step_n(4).unwrap();
    assert_eq!(cpu.wait_state(), WaitState::Sync);
    assert_eq!(cpu.regs.pc, 0x0109);

    assert_eq!(cpu.step().unwrap(), 1);
    assert_eq!(cpu.regs.pc, 0x0109);

    cpu.set_irq(true);
    cpu.step().unwrap();
    assert_eq!(cpu.wait_state(), WaitState::Normal);
    assert_eq!(cpu.regs.a, 0x01);
    assert_eq!(cpu.regs.pc, 0x010A);
}

#[test]
fn sync_takes_unmasked_interrupt() {
    let mut cpu = test_cpu();
    cpu.mem.store(0x0106, &[0x13]);             //      sync
    cpu.step_n(3).unwrap();
    assert_eq!(cpu.wait_state(), WaitState::Sync);

    cpu.set_irq(true);
    assert_eq!(cpu.step().unwrap(), 19);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_eq!(cpu.mem.loadw(cpu.regs.s + 10), 0x0107);
}

#[test]
fn cwai_wakes_without_restacking() {
    let mut cpu = test_cpu();
    cpu.mem.store(0x0106, &[                    //      org $106
        0x3C, 0xEF,                             //      cwai #$EF
        0x4C,                                   //      inca
    ]);
    cpu.step_n(2).unwrap();
    cpu.regs.a = 0x41;

    assert_eq!(cpu.step().unwrap(), 20);
    assert_eq!(cpu.wait_state(), WaitState::Cwai);
    assert_eq!(cpu.regs.s, 0x0400 - 12);
    assert_eq!(cpu.mem.loadb(cpu.regs.s + 1), 0x41);

    assert_eq!(cpu.step().unwrap(), 1);

    cpu.set_irq(true);
    assert_eq!(cpu.step().unwrap(), 7);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_eq!(cpu.regs.s, 0x0400 - 12);

    cpu.set_irq(false);
    cpu.regs.a = 0x00;
    cpu.step().unwrap();                        // rti
    assert_eq!(cpu.regs.pc, 0x0108);
    assert_eq!(cpu.regs.s, 0x0400);
    assert_eq!(cpu.regs.a, 0x41);

    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x42);
}

#[test]
fn swi_masks_but_swi2_does_not() {
    let mut cpu = test_cpu();
    cpu.mem.store(0x0106, &[                    //      org $106
        0x10, 0x3F,                             //      swi2
        0x3F,                                   //      swi
    ]);
    cpu.step_n(2).unwrap();

    assert_eq!(cpu.step().unwrap(), 20);
    assert_eq!(cpu.regs.pc, SWI2_HANDLER);
    assert_flags! { cpu => CC_E: true, CC_I: false, CC_F: false }

    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x0108);

    assert_eq!(cpu.step().unwrap(), 19);
    assert_eq!(cpu.regs.pc, SWI_HANDLER);
    assert_flags! { cpu => CC_E: true, CC_I: true, CC_F: true }

    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x0109);
    assert_eq!(cpu.regs.s, 0x0400);
    assert_flags! { cpu => CC_I: false, CC_F: false }
}
