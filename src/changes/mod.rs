mod ingest;
mod model;

pub use ingest::{DiffSection, PageSnapshot, SummaryEntry};
pub use model::{ChangeKind, FileChange};
