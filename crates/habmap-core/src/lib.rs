//! habmap Core - Domain models, configuration, and dataset format readers
//!
//! This crate contains the core domain types shared by the layer server and the
//! map client, plus the readers that pull vector layers off disk.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{HabmapError, Result};
