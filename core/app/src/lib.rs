//! PipeStash client application layer.
//!
//! Ties the pieces together for a presentation shell:
//! - [`PipeStash`]: login, account creation, resume and logout
//! - [`ActiveSession`]: upload, delete, download, public links and balance
//!   for the logged-in account, with the index/broadcast/observer wiring
//! - [`ClientConfig`] and [`logging::init_logging`] for the ambient setup

pub mod client;
pub mod config;
pub mod downloads;
pub mod logging;
pub mod progress;
pub mod session;
pub mod share;
pub mod views;

pub use client::PipeStash;
pub use config::ClientConfig;
pub use session::ActiveSession;
pub use share::ShareOutcome;
pub use views::{BalanceView, FileListView, PreviewLoader};
