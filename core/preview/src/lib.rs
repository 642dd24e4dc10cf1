//! Image previews for PipeStash.
//!
//! Previews are derived from the local file index: for each image record the
//! content is fetched from the backend and held as an in-memory blob until the
//! next reload supersedes it.

pub mod blob;
pub mod cache;
pub mod image;

pub use blob::{BlobArena, PreviewHandle};
pub use cache::{PreviewCache, ReloadReport};
pub use image::{image_mime, IMAGE_TYPES};
