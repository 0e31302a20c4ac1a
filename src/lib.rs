// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A grep-compatible, multi-backend parallel search core: literal and
//! BRE/ERE regular-expression search over byte buffers, dispatched across a
//! CPU engine and optional Metal/Vulkan GPU engines depending on input size,
//! pattern shape, and detected hardware.
//!
//! The public entry points are [`engine::search`] and [`engine::search_many`];
//! everything else is the machinery they wire together.

pub mod aggregate;
pub mod capability;
pub mod cpu;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod literal;
pub mod multi;
pub mod options;
pub mod regex;
pub mod result;
pub mod skip;

#[cfg(feature = "perl")]
pub mod pcre;

pub use engine::{search, search_many};
pub use error::{Error, Result};
pub use options::{BackendChoice, DispatchTuning, SearchOptions};
pub use result::{MatchRecord, SearchResult};
