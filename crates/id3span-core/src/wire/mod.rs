//! Wire-format decoding modules.
//!
//! The tag format follows a layered structure:
//! - `layout`: byte offsets, flag masks and size caps (source of truth)
//! - `reader`: safe, positioned byte access over the tag span
//! - `sync`: synchsafe integers and the unsynchronization transform
//! - `header` / `frame`: domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; the decode layer handles stream
//! access and aggregation.

pub mod error;
pub mod frame;
pub mod header;
pub mod layout;
pub mod reader;
pub mod sync;
