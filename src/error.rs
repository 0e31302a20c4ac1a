// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error;
use std::fmt;

/// Errors produced by the regex compiler, the search engines, and the
/// backend dispatcher.
///
/// Resource-acquisition and execution errors for the GPU backends
/// (`GpuUnavailable`) are intercepted by the dispatcher and never escape to
/// callers; they're part of this enum only so the GPU drivers and the
/// dispatcher can share one error type internally.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The pattern could not be parsed for an unspecified structural reason.
    InvalidPattern(String),
    /// A `(` has no matching `)`.
    UnmatchedParen,
    /// A `[` has no matching `]`.
    UnmatchedBracket,
    /// A quantifier (`*`, `+`, `?`, `{n,m}`) was applied with nothing to
    /// repeat, or `{n,m}` has `n > m`.
    InvalidQuantifier,
    /// An escape sequence (`\x`) is not recognized.
    InvalidEscape(char),
    /// A character class range like `a-b` has `a > b`.
    InvalidRange,
    /// The pattern compiles to more states than the implementation's cap.
    PatternTooComplex,
    /// A literal pattern exceeds the 256-byte bound from the data model.
    PatternTooLong,
    /// GPU resource acquisition or kernel execution failed; the dispatcher
    /// catches this and retries on the CPU engine.
    GpuUnavailable(String),
    /// Propagated I/O error at the boundary (file reads, stdin).
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidPattern(ref msg) => write!(f, "invalid pattern: {}", msg),
            Error::UnmatchedParen => write!(f, "unmatched ( in pattern"),
            Error::UnmatchedBracket => write!(f, "unmatched [ in pattern"),
            Error::InvalidQuantifier => write!(f, "invalid quantifier"),
            Error::InvalidEscape(c) => write!(f, "invalid escape sequence: \\{}", c),
            Error::InvalidRange => write!(f, "invalid character class range"),
            Error::PatternTooComplex => write!(f, "pattern too complex (state cap exceeded)"),
            Error::PatternTooLong => write!(f, "pattern exceeds maximum length"),
            Error::GpuUnavailable(ref msg) => write!(f, "gpu unavailable: {}", msg),
            Error::Io(ref msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
