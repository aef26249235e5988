//! Scanning and auto-detection
//!
//! `session` runs one compiled grammar over one input and builds its token tree.
//! `auto` picks the likeliest grammar for an input out of several candidates.

pub mod auto;
pub mod session;

pub use session::{Continuation, Frame, ScanError, ScanOptions, ScanOutput, Session};
