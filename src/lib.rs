//
// lib.rs --- SBC09 core library.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Emulation of a 6809-based single board computer with a
//! 2MB linked-list memory management unit.

pub mod emu;
