use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage category a file is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Documents,
    Images,
    Videos,
    Other,
}

/// Extension table, in lookup order. The first category listing an
/// extension wins.
const EXTENSION_TABLE: &[(Category, &[&str])] = &[
    (Category::Documents, &["pdf", "doc", "docx", "txt", "xlsx"]),
    (Category::Images, &["jpg", "jpeg", "png", "gif"]),
    (Category::Videos, &["mp4", "avi", "mov", "mkv", "flv", "wmv", "webm"]),
];

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Documents,
        Category::Images,
        Category::Videos,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Documents => "documents",
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Other => "other",
        }
    }

    /// Row marker shown next to a file of this category.
    pub fn icon(self) -> &'static str {
        match self {
            Category::Documents => "[doc]",
            Category::Images => "[img]",
            Category::Videos => "[vid]",
            Category::Other => "[file]",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a file name by the text after its last `.`, ignoring case.
/// Names without a dot have no extension and are `Other`.
pub fn classify(filename: &str) -> Category {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return Category::Other;
    };
    let ext = ext.to_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Active category selection on the dashboard. `All` disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Documents,
    Images,
    Videos,
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Documents => category == Category::Documents,
            CategoryFilter::Images => category == Category::Images,
            CategoryFilter::Videos => category == Category::Videos,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Documents => "documents",
            CategoryFilter::Images => "images",
            CategoryFilter::Videos => "videos",
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CategoryFilter::All),
            "documents" | "docs" => Ok(CategoryFilter::Documents),
            "images" => Ok(CategoryFilter::Images),
            "videos" => Ok(CategoryFilter::Videos),
            other => Err(format!(
                "unknown category '{other}' (expected all, documents, images or videos)"
            )),
        }
    }
}

/// Guess MIME type from filename extension, for the upload part header.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
