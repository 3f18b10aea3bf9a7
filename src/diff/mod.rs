mod normalize;
mod observe;

pub use normalize::{normalize, DiffLineRecord, LineKind, LineTone};
pub use observe::{ObservationHandle, ObserveLimits, ObserveMode, Observations};
