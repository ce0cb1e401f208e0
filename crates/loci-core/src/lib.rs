//! Loci Core - Foundational types for the Loci particle engine
//!
//! This crate provides the types that all other Loci crates depend on:
//! - `SystemId` - Handles for live particle systems
//! - `Vec3` - Spatial vector
//! - `Rgb` - Linear RGB colour
//! - Error types and Result alias

mod error;
mod id;
mod types;

pub use error::{LociError, Result};
pub use id::SystemId;
pub use types::{Rgb, Vec3};
