//! Core library for translating subtitle files through a remote language
//! model while keeping index and timing lines untouched.

pub mod chunk;
pub mod config;
pub mod pipeline;
pub mod srt;
pub mod translate;
