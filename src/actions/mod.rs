//! File actions module.
//!
//! This module provides functionality for:
//! - Filesystem primitives behind the [`FileOps`] trait (copy, move, delete,
//!   optionally through the system trash)
//! - Planning which files a command processes
//! - Executing copy, move and delete batches
//!
//! ```no_run
//! use cataloguer::actions::{FileOps, StdFileOps};
//! use std::path::Path;
//!
//! let ops = StdFileOps { use_trash: true };
//! ops.delete(Path::new("/photos/IMG_0001 (copy).jpg"))?;
//! # Ok::<(), cataloguer::actions::OpError>(())
//! ```

pub mod executor;
pub mod ops;
pub mod plan;

pub use executor::{BatchReport, Executor, FileReport, FileState, Operation};
pub use ops::{FileOps, OpError, StdFileOps};
pub use plan::{
    check_overlap, extract_files, plan_delete, plan_transfer, Extraction, OperationPlan,
    PlanError,
};
