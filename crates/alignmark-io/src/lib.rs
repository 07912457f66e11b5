//! # alignmark I/O
//!
//! GDS-II stream writing and reading for [`alignmark_core::LayoutDatabase`],
//! plus the output-path policy used when saving generated layouts.

pub mod gds;
pub mod output;
mod record;

pub use gds::{GdsError, GdsReader, GdsWriter, MAX_BOUNDARY_POINTS};
pub use output::{read_gds_file, resolve_output_path, save_layout, write_gds_file};
