//! Active-account handling for PipeStash.

pub mod session;

pub use session::{AccountSession, ACCOUNT_KEY};
