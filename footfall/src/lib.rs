//! The footfall synthetic shopper traffic generator.
//!
//! This library supports the footfall binary found elsewhere in this
//! project: it simulates many independent shoppers browsing a fictitious
//! web shop and reports each simulated action to zero or more analytics
//! destinations. The bits and pieces here are not intended to be used
//! outside of supporting footfall, although if they are helpful in other
//! domains that's a nice surprise.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub(crate) mod common;
pub mod config;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod shopper;
pub mod visit;
