//! Attachment foldering and naming.
//!
//! Every attachment belongs to a named folder; images default to `Images`
//! and everything else to `Documents`. Uploaded files are renamed after the
//! project (and caption) so that downloads stay recognisable.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::models::TimelineEvent;

pub const DOCUMENTS_FOLDER: &str = "Documents";
pub const IMAGES_FOLDER: &str = "Images";

/// Longest caption kept in a generated file name, in characters.
pub const MAX_CAPTION_CHARS: usize = 30;

const IMAGE_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
    "image/x-icon",
];

/// Characters that are never allowed in a path segment.
const FORBIDDEN: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Punctuation that survives sanitising.
const KEPT_PUNCTUATION: [char; 7] = ['-', '_', '.', '(', ')', '[', ']'];

pub fn is_image_type(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or("").trim();
    IMAGE_TYPES.iter().any(|t| t.eq_ignore_ascii_case(base))
}

pub fn default_folder(is_image: bool) -> &'static str {
    if is_image {
        IMAGES_FOLDER
    } else {
        DOCUMENTS_FOLDER
    }
}

/// The explicitly chosen folder wins over the type-based default.
pub fn resolve_folder(explicit: Option<&str>, is_image: bool) -> String {
    match explicit.map(str::trim) {
        Some(folder) if !folder.is_empty() => folder.to_string(),
        _ => default_folder(is_image).to_string(),
    }
}

/// Make a string safe to use as a single path segment.
///
/// Whitespace runs collapse to `_`; path separators, reserved characters and
/// ASCII punctuation other than `-_.()[]` are dropped.
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;

    for c in raw.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;

        if FORBIDDEN.contains(&c) || c.is_control() {
            continue;
        }
        if c.is_ascii_punctuation() && !KEPT_PUNCTUATION.contains(&c) {
            continue;
        }
        out.push(c);
    }

    out.trim_matches('_').to_string()
}

/// Extension of the original name; dot-files like `.png` count as one.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .or_else(|| original_name.rsplit_once('.').map(|(_, ext)| ext))
        .filter(|e| !e.is_empty())
        .unwrap_or("dat")
        .to_string()
}

/// Display name for an uploaded attachment.
///
/// Images and captioned files are renamed `<title>_<suffix>.<ext>`, where the
/// suffix is the caption (at most [`MAX_CAPTION_CHARS`]) or a
/// `yyyyMMdd_HHmmss` timestamp. Other files keep their original name.
pub fn display_name(
    project_title: &str,
    original_name: &str,
    is_image: bool,
    caption: Option<&str>,
    now: NaiveDateTime,
) -> String {
    let caption = caption
        .map(sanitize_segment)
        .filter(|c| !c.is_empty());

    if !is_image && caption.is_none() {
        return original_name.to_string();
    }

    let suffix = match caption {
        Some(c) => c.chars().take(MAX_CAPTION_CHARS).collect(),
        None => now.format("%Y%m%d_%H%M%S").to_string(),
    };

    let title = sanitize_segment(project_title);
    let ext = extension_of(original_name);
    if title.is_empty() {
        format!("{}.{}", suffix, ext)
    } else {
        format!("{}_{}.{}", title, suffix, ext)
    }
}

/// Folders offered for a project: the two defaults plus every folder used
/// by an attachment of its events, sorted.
pub fn project_folders(events: &[TimelineEvent]) -> Vec<String> {
    let mut folders: BTreeSet<String> = BTreeSet::new();
    folders.insert(DOCUMENTS_FOLDER.to_string());
    folders.insert(IMAGES_FOLDER.to_string());

    for event in events {
        for attachment in &event.attachments {
            if let Some(folder) = attachment.folder.as_deref() {
                let folder = folder.trim();
                if !folder.is_empty() {
                    folders.insert(folder.to_string());
                }
            }
        }
    }

    folders.into_iter().collect()
}

/// Re-file one attachment. The stored name is left alone.
///
/// Returns false when the index is out of range.
pub fn move_attachment(event: &mut TimelineEvent, index: usize, folder: &str) -> bool {
    match event.attachments.get_mut(index) {
        Some(attachment) => {
            attachment.folder = Some(folder.trim().to_string());
            true
        }
        None => false,
    }
}

/// Storage prefix of an upload, relative to the upload root.
///
/// Project uploads go to `projects/<project>/<category>`, report uploads to
/// `reports/<owner>/<category>`, other explicit folders to
/// `<folder>/<category>` and everything else to `uploads/<category>`.
pub fn storage_folder(
    project_name: Option<&str>,
    report_owner: &str,
    folder: Option<&str>,
    is_image: bool,
) -> String {
    let category = default_folder(is_image);
    let project = project_name.map(sanitize_segment).filter(|p| !p.is_empty());
    let folder = folder
        .map(|f| {
            f.split('/')
                .map(sanitize_segment)
                .filter(|s| !s.is_empty() && s != "." && s != "..")
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|f| !f.is_empty());

    match (project, folder) {
        (Some(project), _) => format!("projects/{}/{}", project, category),
        (None, Some(f)) if f.starts_with("reports") => {
            let owner = sanitize_segment(report_owner);
            format!("reports/{}/{}", owner, category)
        }
        (None, Some(f)) => format!("{}/{}", f, category),
        (None, None) => format!("uploads/{}", category),
    }
}

/// Object key under a storage folder; `unique` keeps concurrent uploads of
/// the same name apart.
pub fn object_key(folder: &str, unique: &str, file_name: &str) -> String {
    let name = sanitize_segment(file_name);
    let name = if name.is_empty() { "unnamed".to_string() } else { name };
    format!("{}/{}_{}", folder, unique, name)
}
