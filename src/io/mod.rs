//! I/O with the outside world: external processes and staged files.

mod files;
mod process;

pub use files::{copy_files, create_run_dir, ensure_dir, remove_files};
pub use process::{run_checked, Invocation, ProcessRunner, TokioProcessRunner};
