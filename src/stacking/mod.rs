//! Multi-frame stacking.
//!
//! Turns the frames accumulated during an exposure window into a single
//! long-exposure style image. Pure and deterministic: no I/O, no shared
//! state.

mod lighten;

pub use lighten::{stack, StackError, ATTENUATION};
