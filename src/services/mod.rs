//! Service layer
//!
//! Service types that keep infrastructure concerns (file access, progress
//! reporting) out of the compositing stages.

pub mod io;
pub mod progress;

pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
