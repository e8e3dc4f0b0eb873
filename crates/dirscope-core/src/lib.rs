//! Core types and traits for dirscope.
//!
//! This crate provides the tree node type produced by a scan, the observer
//! protocol consumers subscribe to, and the error taxonomy shared by the
//! scanning engine.

mod entry;
mod error;
mod event;

pub use entry::{Descendants, Entry, EntryKind, EntryState};
pub use error::ScanError;
pub use event::{Observers, ScanEvent, ScanEventKind, ScanObserver};
