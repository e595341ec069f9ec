//! Test infrastructure for the fabric compiler
//!
//! Provides:
//! - Reference fabrics (six hosts, two VLANs, three leaves, one or two spines)
//! - A pipeline simulator that walks frames through compiled tables
//! - Verification helpers for delivery, tag discipline and ARP handling

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
