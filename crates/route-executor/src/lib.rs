#![deny(unreachable_patterns)]

//! Container Executor: runs the render container as a supervised child
//! process and translates its output into progress events and a memory
//! profile.

pub mod command;
pub mod error;
pub mod gpu;
pub mod memory;
pub mod progress;
pub mod runner;

pub use command::ContainerCommand;
pub use error::{ExecutorError, ExecutorResult};
pub use memory::{MemoryEvent, MemoryMonitor, MemoryMonitorConfig};
pub use progress::{parse_progress_line, FrameProgress};
pub use runner::{ContainerRunner, ExecResult};
