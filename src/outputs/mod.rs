//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: writes the [`Digest`](crate::models::Digest) to `regwatch.json`
//!   plus a dated snapshot for consumption by the rendering widget

pub mod json;
