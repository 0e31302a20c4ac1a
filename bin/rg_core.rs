// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Minimal CLI front-end (spec.md §6). Hand-rolled flag parsing -- no
//! `clap`, matching the scale of the teacher's own binaries -- reads the
//! pattern and one or more files (or stdin), prints matching lines, and
//! sets the exit code grep-compatibly: 0 if any match, 1 if none, 2 on
//! error.

use anyhow::{bail, Context, Result};
use rg_core::{BackendChoice, SearchOptions};
use std::io::Read;
use std::process::ExitCode;

struct Args {
    pattern: String,
    files: Vec<String>,
    options: SearchOptions,
}

fn parse_args() -> Result<Args> {
    let mut options = SearchOptions::default();
    let mut positional = Vec::new();

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-i" | "--ignore-case" => options.case_insensitive = true,
            "-w" | "--word-regexp" => options.word_boundary = true,
            "-v" | "--invert-match" => options.invert_match = true,
            "-F" | "--fixed-strings" => options.fixed_string = true,
            "-E" | "--extended-regexp" => options.extended = true,
            "-P" | "--perl-regexp" => options.perl = true,
            "--backend" => {
                let value = iter.next().context("--backend requires a value")?;
                options.backend = match value.as_str() {
                    "auto" => BackendChoice::Auto,
                    "cpu" => BackendChoice::Cpu,
                    "gpu" => BackendChoice::Gpu,
                    "metal" => BackendChoice::Metal,
                    "vulkan" => BackendChoice::Vulkan,
                    other => bail!("unknown backend: {other}"),
                };
            }
            "--" => {
                positional.extend(iter.by_ref());
                break;
            }
            _ if arg.starts_with('-') && arg.len() > 1 => bail!("unrecognized flag: {arg}"),
            _ => positional.push(arg),
        }
    }

    if positional.is_empty() {
        bail!("usage: rg_core [OPTIONS] PATTERN [FILE...]");
    }
    let pattern = positional.remove(0);
    Ok(Args { pattern, files: positional, options })
}

fn read_input(files: &[String]) -> Result<Vec<u8>> {
    if files.is_empty() {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }
    let mut buf = Vec::new();
    for path in files {
        let mut file = std::fs::File::open(path).with_context(|| format!("opening {path}"))?;
        file.read_to_end(&mut buf).with_context(|| format!("reading {path}"))?;
    }
    Ok(buf)
}

fn run() -> Result<bool> {
    let args = parse_args()?;
    env_logger::init();
    let text = read_input(&args.files)?;
    let result = rg_core::search(&text, args.pattern.as_bytes(), &args.options)?;

    let deduped = rg_core::aggregate::dedup_by_line(&result);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    use std::io::Write;
    for m in &deduped {
        let line_end = memchr::memchr(b'\n', &text[m.line_start as usize..])
            .map(|off| m.line_start as usize + off)
            .unwrap_or(text.len());
        out.write_all(&text[m.line_start as usize..line_end])?;
        out.write_all(b"\n")?;
    }
    Ok(!deduped.is_empty())
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("rg_core: {e:#}");
            ExitCode::from(2)
        }
    }
}
