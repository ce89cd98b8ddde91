//! Console helpers shared by the pipeline and the CLI

pub mod progress;
pub mod styling;

pub use progress::{create_progress_bar, create_spinner, finish_with_success};
pub use styling::*;
