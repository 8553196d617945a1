//! Drive: the client-side file view model.
//!
//! Holds the file listing returned by the server, classifies files into
//! storage categories, filters and searches the listing, and aggregates
//! storage usage for display.

pub mod category;
pub mod format;
pub mod schema;
pub mod storage;
pub mod view;

pub use category::{classify, Category, CategoryFilter};
pub use format::{format_size, format_storage_size, DisplayAmount, DisplayUnit};
pub use schema::FileRecord;
pub use storage::DownloadDir;
pub use view::{aggregate, can_accept, visible_files, StorageUsage, ViewState, DEFAULT_QUOTA_BYTES};
