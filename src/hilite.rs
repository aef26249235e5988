//! Main module for hilite library functionality

pub mod compiling;
pub mod emitter;
pub mod error;
pub mod formats;
pub mod grammar;
pub mod highlighter;
pub mod highlighting;
pub mod keywords;
pub mod modes;
pub mod patterns;
pub mod registry;
pub mod settings;
pub mod testing;
