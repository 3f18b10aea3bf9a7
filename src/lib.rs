//! review-tree: a file-change tree, persistent review marks and diff-line
//! normalization for code review pages.
//!
//! The host page is read as a JSON [`changes::PageSnapshot`]. Everything the
//! core does to the page is a typed [`app::ViewOp`] handed to an
//! [`app::ViewSink`]; [`app::Bootstrap`] drives one [`app::Session`] per page
//! load.

pub mod app;
pub mod changes;
pub mod config;
pub mod diff;
pub mod review;
pub mod tree;
pub mod ui;
pub mod watch;

pub use app::{Bootstrap, Phase, Session, ViewOp, ViewSink};
pub use changes::PageSnapshot;
pub use config::{load_config, RtConfig};
