//! Conversion pipeline and batch orchestration for pbrtjson.
//!
//! This crate ties the pure parser to the file system: it resolves `Include`
//! directives recursively, writes JSON artifacts, and drives whole scene
//! collections (including auxiliary asset copies).

pub mod assembler;
pub mod batch;
pub mod convert;
pub mod fs;

pub use batch::{BatchFailure, BatchReport, ProgressReporter, SilentProgress, run_batch};
pub use convert::{ConvertOutcome, convert_file, output_path_for};
pub use fs::{MemoryFs, OsFs, SceneFs};
