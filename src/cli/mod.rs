//! CLI-only adapters.
#![allow(missing_docs)]

pub mod render;
