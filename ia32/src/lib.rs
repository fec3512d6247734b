//! Bit-exact models of the x86 address translation structures and of the VMCS
//! field encoding.
//!
//! - [`paging`]: 32-bit and 4-level paging entries, CR3 and their walkers.
//! - [`ept`]: extended page table entries, EPTP, capabilities, the EPT walker
//!   and EPT-violation exit qualifications.
//! - [`vmcs`]: the VMCS field identifier codec and every architectural field.
//!
//! All operations are pure functions over caller provided values. Table
//! memory is read through [`PhysicalMemory`] and never written.

#![cfg_attr(not(test), no_std)]

#[macro_use] extern crate static_assertions;

pub mod ept;
pub mod error;
pub mod paging;
pub mod utils;
pub mod vmcs;
pub mod walk;

pub use error::{Error, Result};
pub use utils::memory::PhysicalMemory;
pub use walk::{translate, HierarchyKind, Translation, WalkPath, WalkStep};
