//
// sbc09emu.rs --- Emulator tool entry point.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::env;
use std::process::exit;

use getopts::Options;

use sbc09::emu::clock::{self, SPEEDS};
use sbc09::emu::{Board, Mmu, Result};

fn print_usage(opts: Options) {
    let brief = "Usage: sbc09emu [OPTIONS...] FILE...".to_string();
    print!("{}", opts.usage(&brief));
}

/// Parse and validate command line options, returning the `Matches`
/// object containing option information.
fn parse_options() -> getopts::Matches {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::new();

    opts.optopt("e", "entry", "entry point address (default: reset vector at FFFE)", "ADDR");
    opts.optopt("u", "until", "run until this PC", "ADDR");
    opts.optopt("n", "steps", "execute at most N instructions", "N");
    opts.optopt("s", "speed", "clock speed level 0-15 (default: 7, 1MHz)", "LEVEL");
    opts.optflag("", "selftest", "run the MMU self tests and exit");
    opts.optflag("", "help", "display this help and exit");
    opts.optflag("", "version", "output version information and exit");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => { m },
        Err(f) => {
            println!("sbc09emu: {}\n", f);
            print_usage(opts);
            exit(1);
        },
    };

    if matches.opt_present("help") {
        print_usage(opts);
        exit(0);
    }

    if matches.opt_present("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        exit(0);
    }

    if matches.free.is_empty() && !matches.opt_present("selftest") {
        println!("sbc09emu: no input files\n");
        print_usage(opts);
        exit(1);
    }

    matches
}

fn parse_addr(matches: &getopts::Matches, opt: &str) -> Result<Option<u16>> {
    match matches.opt_str(opt) {
        Some(arg) => Ok(Some(u16::from_str_radix(&arg, 16)?)),
        None => Ok(None),
    }
}

/// Run every MMU command's self test. Returns true if all pass.
fn self_test() -> bool {
    let results = Mmu::self_test();
    for r in results.iter() {
        println!("{:<12} {}", r.name, if r.passed { "ok" } else { "FAILED" });
    }
    results.iter().all(|r| r.passed)
}

fn run() -> Result<()> {
    let matches = parse_options();

    if matches.opt_present("selftest") {
        if !self_test() {
            exit(1);
        }
        return Ok(());
    }

    let mut board = Board::new()?;
    for infile in matches.free.iter() {
        board.load_hex_file(infile)?;
    }
    board.reset();

    if let Some(entry) = parse_addr(&matches, "e")? {
        board.cpu_mut().regs.pc = entry;
    }

    if let Some(arg) = matches.opt_str("s") {
        let level: usize = arg.parse()?;
        if !board.set_speed(level) {
            println!("sbc09emu: speed level must be 0-{}", SPEEDS.len() - 1);
            exit(1);
        }
    }
    log::info!("clock {}", clock::describe(board.clock().hz()));

    let steps: Option<u64> = match matches.opt_str("n") {
        Some(arg) => Some(arg.parse()?),
        None => None,
    };

    let res = match (parse_addr(&matches, "u")?, steps) {
        (Some(addr), _) => board.run_until(addr),
        (None, Some(n)) => board.run_steps(n),
        (None, None) => board.run(),
    };

    println!("{}", board.cpu().regs);
    board.quit();
    res
}

fn main() {
    env_logger::init();

    match run() {
        Ok(_) => (),
        Err(err) => {
            println!("sbc09emu: {}", err);
            exit(1);
        }
    }
}
