//
// loader.rs --- Intel HEX program loader.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

//! Load Intel HEX images into the address space before the CPU
//! starts. Bytes go through `Bus::write_to_rom`, so images may fill
//! ROM as well as RAM.

use std::fs;
use std::path::Path;

use ihex::{Reader, Record};

use crate::emu::bus::{Bus, ADDRESS_SPACE};
use crate::emu::error::{Error, Result};

/// What a HEX image contained.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    /// Bytes written into the address space.
    pub bytes: usize,
    /// Start address from a start record, if any.
    pub start: Option<u16>,
}

/// Load a HEX image held in a string.
pub fn load_ihex_str(bus: &mut Bus, text: &str) -> Result<Image> {
    let mut image = Image::default();
    let mut upper: u32 = 0;

    for rec in Reader::new(text) {
        match rec? {
            Record::Data { offset, value } => {
                let base = upper + offset as u32;
                for (i, b) in value.iter().enumerate() {
                    let addr = base + i as u32;
                    if addr as usize >= ADDRESS_SPACE {
                        return Err(Error::HexRange(addr));
                    }
                    if !bus.write_to_rom(addr as u16, *b) {
                        log::warn!("HEX byte at {:04X} has no memory behind it", addr);
                    }
                }
                image.bytes += value.len();
            },
            Record::ExtendedSegmentAddress(seg) => upper = (seg as u32) << 4,
            Record::ExtendedLinearAddress(hi) => upper = (hi as u32) << 16,
            Record::StartSegmentAddress { ip, .. } => image.start = Some(ip),
            Record::StartLinearAddress(addr) => {
                if addr as usize >= ADDRESS_SPACE {
                    return Err(Error::HexRange(addr));
                }
                image.start = Some(addr as u16);
            },
            Record::EndOfFile => break,
        }
    }

    log::debug!("loaded {} bytes from HEX image", image.bytes);
    Ok(image)
}

/// Load a HEX file from disk.
pub fn load_ihex_file<P: AsRef<Path>>(bus: &mut Bus, path: P) -> Result<Image> {
    let text = fs::read_to_string(path.as_ref())?;
    log::info!("loading {}", path.as_ref().display());
    load_ihex_str(bus, &text)
}
