//
// error.rs --- Emulator error type.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::error;
use std::fmt;
use std::io;
use std::num;
use std::result;

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Parse(num::ParseIntError),
    Hex(ihex::ReaderError),

    /// A HEX record addressed memory outside the 64K address space.
    HexRange(u32),

    /// The fetched opcode has no entry in the instruction table.
    InvalidOpcode { opcode: u16, pc: u16 },

    /// The table entry for this opcode uses an addressing mode the
    /// CPU cannot resolve (e.g. `STA #imm`).
    InvalidAddressingMode { opcode: u16, pc: u16 },

    /// An indexed addressing postbyte selects no valid submode.
    InvalidPostbyte { postbyte: u8, pc: u16 },

    /// A device asked for zero bytes of address space.
    ZeroSizeDevice { name: String, base: u16 },

    /// A device does not fit in what is left of the address space.
    AddressSpaceExhausted { name: String, base: usize, size: usize },
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    /// Return true for faults raised by the CPU while executing.
    pub fn is_cpu_fault(&self) -> bool {
        match *self {
            Error::InvalidOpcode { .. } |
            Error::InvalidAddressingMode { .. } |
            Error::InvalidPostbyte { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IO(ref err) => write!(f, "IO error: {}", err),
            Error::Parse(ref err) => write!(f, "Invalid number: {}", err),
            Error::Hex(ref err) => write!(f, "Invalid HEX record: {}", err),
            Error::HexRange(addr) =>
                write!(f, "HEX record address {:X} outside of memory", addr),
            Error::InvalidOpcode { opcode, pc } =>
                write!(f, "Illegal instruction {:02X} at {:04X}", opcode, pc),
            Error::InvalidAddressingMode { opcode, pc } =>
                write!(f, "Invalid addressing mode for {:02X} at {:04X}", opcode, pc),
            Error::InvalidPostbyte { postbyte, pc } =>
                write!(f, "Invalid indexed postbyte {:02X} at {:04X}", postbyte, pc),
            Error::ZeroSizeDevice { ref name, base } =>
                write!(f, "Device '{}' at {:04X} reserved no memory", name, base),
            Error::AddressSpaceExhausted { ref name, base, size } =>
                write!(f, "Device '{}' ({} bytes at {:04X}) exceeds 64K", name, size, base),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IO(ref err) => Some(err),
            Error::Parse(ref err) => Some(err),
            Error::Hex(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IO(err)
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Error {
        Error::Parse(err)
    }
}

impl From<ihex::ReaderError> for Error {
    fn from(err: ihex::ReaderError) -> Error {
        Error::Hex(err)
    }
}
