mod store;
mod sync;

pub use store::{storage_key, FileStorage, ReviewState, ReviewStateStore, Storage};
pub use sync::{ReviewSyncController, REVIEWED, UN_REVIEWED};

#[cfg(test)]
pub use store::MemoryStorage;
