pub mod assembly;
pub mod summary;

pub use assembly::{create_packages_and_dependencies, Assembled};
pub use summary::{summarize_codebase, Summary, SummaryEntry};
