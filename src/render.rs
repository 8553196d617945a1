//! Rendering boundary between the dashboard controller and the terminal.

use console::{style, Term};

use crate::drive::{format_size, format_storage_size, Category, FileRecord, StorageUsage};

const BAR_WIDTH: usize = 24;

/// Why the file list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// Nothing stored at all.
    NoFiles,
    /// Files exist but none pass the current filter and search.
    NoMatches,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoFiles => "No files yet. Start by uploading a file!",
            EmptyState::NoMatches => "No files found",
        }
    }
}

/// What the dashboard controller draws. Implementations must not call
/// back into the controller.
pub trait DashboardView {
    fn show_files(&mut self, files: &[&FileRecord]);
    fn show_empty(&mut self, state: EmptyState);
    fn show_usage(&mut self, usage: &StorageUsage, quota: u64);
    /// Error or warning that needs the user's attention.
    fn show_alert(&mut self, message: &str);
    /// Success feedback.
    fn show_notice(&mut self, message: &str);
    fn upload_started(&mut self, name: &str);
    fn upload_progress(&mut self, percent: u8);
    fn upload_finished(&mut self);
}

/// Tone of a status line in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// Text bar of `width` cells filled to `percent`.
pub fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

/// Dashboard drawn on stdout.
pub struct TerminalView {
    term: Term,
    upload_name: Option<String>,
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            upload_name: None,
        }
    }

    fn line(&self, text: &str) {
        // Write errors on stdout are ignored.
        let _ = self.term.write_line(text);
    }

    /// Status line for the login and OTP prompts.
    pub fn message(&self, kind: MessageKind, text: &str) {
        let styled = match kind {
            MessageKind::Success => style(text).green(),
            MessageKind::Error => style(text).red(),
        };
        self.line(&styled.to_string());
    }
}

impl DashboardView for TerminalView {
    fn show_files(&mut self, files: &[&FileRecord]) {
        let width = files.iter().map(|f| f.name.chars().count()).max().unwrap_or(0);
        for file in files {
            let category = file.category();
            self.line(&format!(
                "  {} {:<width$}  {:>10}",
                style(format!("{:<6}", category.icon())).dim(),
                file.name,
                format_size(file.size),
                width = width
            ));
        }
    }

    fn show_empty(&mut self, state: EmptyState) {
        self.line(&format!("  {}", style(state.message()).dim()));
    }

    fn show_usage(&mut self, usage: &StorageUsage, quota: u64) {
        let used = usage.used_display();
        let free = usage.free_display(quota);
        let quota_percent = usage.quota_percent(quota);
        self.line(&format!(
            "{} {} {}  [{}] {:.0}%",
            style("Storage").bold(),
            style(format!("{used} Used")).cyan(),
            style(format!("{free} Free")).dim(),
            bar(quota_percent, BAR_WIDTH),
            quota_percent
        ));
        for category in Category::ALL {
            self.line(&format!(
                "  {:<10} {:>10}  [{}]",
                category.label(),
                format_storage_size(usage.bytes(category)),
                bar(usage.percent(category), BAR_WIDTH)
            ));
        }
    }

    fn show_alert(&mut self, message: &str) {
        for text in message.lines() {
            self.line(&style(text).red().to_string());
        }
    }

    fn show_notice(&mut self, message: &str) {
        self.line(&style(message).green().to_string());
    }

    fn upload_started(&mut self, name: &str) {
        self.upload_name = Some(name.to_string());
        self.upload_progress(0);
    }

    fn upload_progress(&mut self, percent: u8) {
        let name = self.upload_name.as_deref().unwrap_or("");
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format!(
            "Uploading: {name}  [{}] {percent}%",
            bar(f64::from(percent), BAR_WIDTH)
        ));
    }

    fn upload_finished(&mut self) {
        if self.upload_name.take().is_some() {
            let _ = self.term.clear_line();
        }
    }
}
