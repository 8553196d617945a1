//! Client-side view model: the file list, its filtered projection and the
//! storage aggregation derived from it.
//!
//! Everything here is pure. [`ViewState`] is the only mutable piece and it
//! keeps `used_bytes` in step with `files` on every mutation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::category::{Category, CategoryFilter};
use super::format::{DisplayAmount, DisplayUnit};
use super::schema::FileRecord;

/// Default storage quota: 5 GiB.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Dashboard state, reset whenever the session starts.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    files: Vec<FileRecord>,
    active_category: CategoryFilter,
    search_query: String,
    used_bytes: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fresh server listing.
    pub fn replace_files(&mut self, files: Vec<FileRecord>) {
        self.used_bytes = total_bytes(&files);
        self.files = files;
    }

    pub fn clear_files(&mut self) {
        self.replace_files(Vec::new());
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.active_category = category;
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn active_category(&self) -> CategoryFilter {
        self.active_category
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn visible(&self) -> Vec<&FileRecord> {
        visible_files(&self.files, self.active_category, &self.search_query)
    }

    pub fn usage(&self) -> StorageUsage {
        aggregate(&self.files)
    }
}

fn total_bytes(files: &[FileRecord]) -> u64 {
    files.iter().map(|f| f.size).sum()
}

/// Admission check for an upload: the file must fit in the free space.
/// A file exactly as large as the free space is accepted.
pub fn can_accept(file_size: u64, used_bytes: u64, quota: u64) -> bool {
    file_size <= quota.saturating_sub(used_bytes)
}

/// Files passing the category filter, then the search filter, in input
/// order.
pub fn visible_files<'a>(
    files: &'a [FileRecord],
    active_category: CategoryFilter,
    search_query: &str,
) -> Vec<&'a FileRecord> {
    let needle = search_query.to_lowercase();
    let searching = !search_query.trim().is_empty();

    files
        .iter()
        .filter(|f| active_category.matches(f.category()))
        .filter(|f| !searching || f.name.to_lowercase().contains(&needle))
        .collect()
}

/// Storage totals derived from a file list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub per_category_bytes: BTreeMap<Category, u64>,
    pub per_category_percent: BTreeMap<Category, f64>,
}

impl StorageUsage {
    pub fn bytes(&self, category: Category) -> u64 {
        self.per_category_bytes.get(&category).copied().unwrap_or(0)
    }

    pub fn percent(&self, category: Category) -> f64 {
        self.per_category_percent.get(&category).copied().unwrap_or(0.0)
    }

    /// Total usage as a `(value, unit)` pair: MB below 0.01 GB, else GB.
    pub fn used_display(&self) -> DisplayAmount {
        DisplayAmount::in_unit(self.used_bytes, DisplayUnit::for_usage(self.used_bytes))
    }

    /// Free space, shown in the same unit as usage.
    pub fn free_display(&self, quota: u64) -> DisplayAmount {
        DisplayAmount::in_unit(
            quota.saturating_sub(self.used_bytes),
            DisplayUnit::for_usage(self.used_bytes),
        )
    }

    /// Share of the quota in use, 0..=100.
    pub fn quota_percent(&self, quota: u64) -> f64 {
        if quota == 0 {
            return 100.0;
        }
        (self.used_bytes as f64 / quota as f64 * 100.0).min(100.0)
    }
}

/// Sum sizes overall and per category. Every category is present in both
/// maps; percentages are all 0 when nothing is stored.
pub fn aggregate(files: &[FileRecord]) -> StorageUsage {
    let mut per_category_bytes: BTreeMap<Category, u64> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();

    for file in files {
        *per_category_bytes.entry(file.category()).or_insert(0) += file.size;
    }

    let used_bytes = total_bytes(files);
    let per_category_percent = per_category_bytes
        .iter()
        .map(|(category, bytes)| {
            let percent = if used_bytes == 0 {
                0.0
            } else {
                *bytes as f64 / used_bytes as f64 * 100.0
            };
            (*category, percent)
        })
        .collect();

    StorageUsage {
        used_bytes,
        per_category_bytes,
        per_category_percent,
    }
}
