//! Incremental decoding of byte streams on both sides of the widget.

pub mod lines;
pub mod sse;

pub use lines::{LineBuffer, MAX_LINE_BYTES};
pub use sse::{DONE_SENTINEL, DATA_PREFIX, DiscardReason, UpstreamEvent};
