mod bootstrap;
pub mod collapse;
mod session;
pub mod view;

pub use bootstrap::{Bootstrap, Phase, StorageFactory};
pub use collapse::{CollapseController, ViewFilters};
pub use session::Session;
pub use view::{LineId, ScrollBehavior, Target, ViewOp, ViewSink};

#[cfg(test)]
pub use view::ViewState;
