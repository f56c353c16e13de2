//! Storage layer for keyrecord
//!
//! This crate implements the store backends:
//! - MemoryStore: FxHashMap of field-maps, sets and lists behind an RwLock,
//!   with atomic batches and blocking list pops
//! - WorkQueue: the delivery collaborator's "next item" / "record outcome"
//!   interface on top of any Store

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod queue;

pub use memory::MemoryStore;
pub use queue::{DeliveryOutcome, WorkQueue};
