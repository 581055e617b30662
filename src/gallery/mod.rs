//! Kept photos.
//!
//! A stacked capture lands in a single temporary slot. Keeping it moves
//! the file into the gallery directory under a timestamped name; the
//! gallery is then trimmed oldest-first to its configured size.

mod retention;
mod store;

pub use retention::is_item_name;
pub use store::{GalleryConfig, GalleryError, GalleryItem, GalleryStore};
