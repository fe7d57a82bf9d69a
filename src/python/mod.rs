//! Embedded Python backend built on RustPython.

pub mod convert;
pub mod runtime;
pub mod sinks;
