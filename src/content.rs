//! Preview content: listings of folders and archives for the overlay.
//!
//! The adapter never fails outward. Anything it cannot read comes back as a
//! `PreviewKind::Error` listing carrying a user-facing message, so the
//! overlay shows "why" instead of the preview lifecycle having to react.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::{FinderEnhanceError, Result};
use crate::logging;

/// Extensions the adapter can list (lowercase, matched as suffixes)
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".tar", ".tar.gz", ".tgz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Directory,
    Archive,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    pub name: String,
    pub kind: ItemKind,
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewContent {
    pub kind: PreviewKind,
    /// Display name of the previewed folder/archive
    pub name: String,
    pub items: Vec<PreviewItem>,
    pub total_items: usize,
    pub truncated: bool,
    pub message: Option<String>,
}

impl PreviewContent {
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: PreviewKind::Error,
            name: name.into(),
            items: Vec::new(),
            total_items: 0,
            truncated: false,
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == PreviewKind::Error
    }
}

/// Source of preview listings
pub trait PreviewContentAdapter {
    fn get_preview(&self, path: &Path) -> PreviewContent;
    /// Pick up listing options after a settings change
    fn apply_config(&mut self, _config: &Config) {}
}

/// Filesystem-backed adapter for folders, zip and tar archives
#[derive(Debug, Clone)]
pub struct FsContentAdapter {
    pub show_hidden: bool,
    pub preview_limit: usize,
    pub archive_limit: usize,
}

impl FsContentAdapter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            show_hidden: config.get_show_hidden_files(),
            preview_limit: config.get_preview_limit(),
            archive_limit: config.get_archive_list_limit(),
        }
    }

    fn load(&self, path: &Path) -> Result<PreviewContent> {
        let metadata = fs::metadata(path).map_err(|e| adapter_error(path, e))?;
        if metadata.is_dir() {
            self.list_directory(path)
        } else if is_archive_path(path) {
            self.list_archive(path)
        } else {
            Err(FinderEnhanceError::ContentAdapter {
                path: path.display().to_string(),
                message: "Preview is not supported for this file type".to_string(),
            })
        }
    }

    fn list_directory(&self, path: &Path) -> Result<PreviewContent> {
        let mut items = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| adapter_error(path, e))? {
            // Unreadable entries are skipped, not fatal
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            let hidden = name.starts_with('.');
            if hidden && !self.show_hidden {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let is_dir = metadata.is_dir();
            items.push(PreviewItem {
                name,
                kind: if is_dir { ItemKind::Directory } else { ItemKind::File },
                size: (!is_dir).then(|| metadata.len()),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
                hidden,
            });
        }

        items.sort_by(compare_items);
        let total_items = items.len();
        let truncated = total_items > self.preview_limit;
        items.truncate(self.preview_limit);

        Ok(PreviewContent {
            kind: PreviewKind::Directory,
            name: display_name(path),
            items,
            total_items,
            truncated,
            message: None,
        })
    }

    fn list_archive(&self, path: &Path) -> Result<PreviewContent> {
        let lower = path.to_string_lossy().to_lowercase();
        let (items, total_items) = if lower.ends_with(".zip") {
            list_zip(path, self.archive_limit)?
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            let file = File::open(path).map_err(|e| adapter_error(path, e))?;
            list_tar(
                path,
                flate2::read::GzDecoder::new(BufReader::new(file)),
                self.archive_limit,
            )?
        } else {
            let file = File::open(path).map_err(|e| adapter_error(path, e))?;
            list_tar(path, BufReader::new(file), self.archive_limit)?
        };

        Ok(PreviewContent {
            kind: PreviewKind::Archive,
            name: display_name(path),
            truncated: total_items > items.len(),
            items,
            total_items,
            message: None,
        })
    }
}

impl Default for FsContentAdapter {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PreviewContentAdapter for FsContentAdapter {
    fn get_preview(&self, path: &Path) -> PreviewContent {
        let start = std::time::Instant::now();
        let content = match self.load(path) {
            Ok(content) => content,
            Err(e) => {
                logging::log("CONTENT", &format!("Preview failed: {}", e));
                PreviewContent::error(display_name(path), e.user_message())
            }
        };
        logging::log_perf("content_listing", start.elapsed().as_millis() as u64, 100);
        content
    }

    fn apply_config(&mut self, config: &Config) {
        *self = Self::from_config(config);
    }
}

fn adapter_error(path: &Path, e: impl std::fmt::Display) -> FinderEnhanceError {
    FinderEnhanceError::ContentAdapter {
        path: path.display().to_string(),
        message: format!("Cannot read {}: {}", display_name(path), e),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Directories first, then case-insensitive name
fn compare_items(a: &PreviewItem, b: &PreviewItem) -> Ordering {
    match (a.kind, b.kind) {
        (ItemKind::Directory, ItemKind::File) => Ordering::Less,
        (ItemKind::File, ItemKind::Directory) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

pub fn is_archive_path(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn list_zip(path: &Path, limit: usize) -> Result<(Vec<PreviewItem>, usize)> {
    let file = File::open(path).map_err(|e| adapter_error(path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| adapter_error(path, e))?;
    let total = archive.len();
    let mut items = Vec::with_capacity(total.min(limit));

    for index in 0..total.min(limit) {
        // Raw access skips decompression (and password checks)
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| adapter_error(path, e))?;
        let is_dir = entry.is_dir();
        let stamp = entry.last_modified();
        let modified_at = NaiveDate::from_ymd_opt(
            i32::from(stamp.year()),
            u32::from(stamp.month()),
            u32::from(stamp.day()),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(stamp.hour()),
                u32::from(stamp.minute()),
                u32::from(stamp.second()),
            )
        })
        .map(|naive| Utc.from_utc_datetime(&naive));

        let name = entry.name().to_string();
        items.push(PreviewItem {
            hidden: is_hidden_entry(&name),
            kind: if is_dir { ItemKind::Directory } else { ItemKind::File },
            size: (!is_dir).then(|| entry.size()),
            modified_at,
            name,
        });
    }

    Ok((items, total))
}

fn list_tar<R: Read>(path: &Path, reader: R, limit: usize) -> Result<(Vec<PreviewItem>, usize)> {
    let mut archive = tar::Archive::new(reader);
    let mut items = Vec::new();
    let mut total = 0usize;

    for entry in archive.entries().map_err(|e| adapter_error(path, e))? {
        let entry = entry.map_err(|e| adapter_error(path, e))?;
        total += 1;
        if items.len() >= limit {
            continue;
        }
        let header = entry.header();
        let is_dir = header.entry_type().is_dir();
        let name = entry
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|e| adapter_error(path, e))?;
        items.push(PreviewItem {
            hidden: is_hidden_entry(&name),
            kind: if is_dir { ItemKind::Directory } else { ItemKind::File },
            size: if is_dir { None } else { header.size().ok() },
            modified_at: header
                .mtime()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single()),
            name,
        });
    }

    Ok((items, total))
}

fn is_hidden_entry(name: &str) -> bool {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|last| last.starts_with('.'))
}

// =============================================================================
// Display helpers
// =============================================================================

/// Human-readable size: 1024-based units, at most one decimal, trailing `.0` dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}

/// "Today", "Yesterday", "N days ago" within a week, otherwise "Mon D".
pub fn format_relative_date(modified: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const DAY_SECS: i64 = 24 * 60 * 60;
    let diff_secs = (now - modified).num_seconds().abs();
    // Ceiling division: anything within the last 24h counts as day 1
    let days = ((diff_secs + DAY_SECS - 1) / DAY_SECS).max(1);

    match days {
        1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days - 1),
        _ => format!("{} {}", month_abbrev(modified.month()), modified.day()),
    }
}

fn month_abbrev(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

/// Row glyph by kind and extension
pub fn item_glyph(item: &PreviewItem) -> &'static str {
    if item.kind == ItemKind::Directory {
        return "📁";
    }
    let ext = Path::new(&item.name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "md" => "📝",
        "pdf" => "📕",
        "doc" | "docx" => "📘",
        "xls" | "xlsx" => "📗",
        "ppt" | "pptx" => "📙",
        "zip" | "rar" | "7z" | "tar" | "gz" => "🗜️",
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" => "🖼️",
        "mp3" | "wav" | "flac" => "🎵",
        "mp4" | "avi" | "mov" | "mkv" => "🎬",
        "js" | "cpp" | "c" => "⚡",
        "html" => "🌐",
        "css" => "🎨",
        "json" | "xml" => "⚙️",
        "py" => "🐍",
        "java" => "☕",
        "swift" => "🦉",
        "php" => "🐘",
        "rb" => "💎",
        "go" => "🐹",
        "rs" => "🦀",
        _ => "📄",
    }
}

/// One display line per item: glyph, name, and size/date metadata
pub fn format_item_row(item: &PreviewItem, now: DateTime<Utc>) -> String {
    let mut meta = Vec::new();
    match (item.kind, item.size) {
        (ItemKind::Directory, _) => meta.push("Folder".to_string()),
        (ItemKind::File, Some(size)) => meta.push(format_file_size(size)),
        (ItemKind::File, None) => {}
    }
    if let Some(modified) = item.modified_at {
        meta.push(format_relative_date(modified, now));
    }

    if meta.is_empty() {
        format!("{}  {}", item_glyph(item), item.name)
    } else {
        format!("{}  {}    {}", item_glyph(item), item.name, meta.join(" • "))
    }
}

/// Plain-text rendering of a whole preview, as the overlay shows it.
pub fn render_preview_text(content: &PreviewContent, now: DateTime<Utc>) -> String {
    if content.is_error() {
        let message = content
            .message
            .as_deref()
            .unwrap_or("Unable to read contents");
        return format!("Preview unavailable\n\n{}", message);
    }

    let mut header = format!("{}    {} item(s)", content.name, content.total_items);
    if content.truncated {
        header.push_str(&format!(", showing first {}", content.items.len()));
    }
    if content.items.is_empty() {
        return format!("{}\n\nThis folder is empty", header);
    }

    let rows: Vec<String> = content
        .items
        .iter()
        .map(|item| format_item_row(item, now))
        .collect();
    format!("{}\n\n{}", header, rows.join("\n"))
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
