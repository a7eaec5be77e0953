#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::similar_names
)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod file;
pub mod format;
pub mod hash;
pub mod launch;
pub mod logger;
pub mod nav;
pub mod search;
pub mod serde;
pub mod stats;
pub mod task;
