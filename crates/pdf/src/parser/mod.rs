//! Content-stream parsing: the `lopdf` backend and the layout pass that turns
//! text-showing operators into spans, lines and blocks.

pub mod backend;
pub mod layout;
