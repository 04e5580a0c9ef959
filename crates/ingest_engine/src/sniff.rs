//! Content-type detection from leading bytes rather than declared headers.
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::decode::decode_text;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 8 * 1024;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const EMPTY: &str = "application/x-empty";

/// Detect the MIME type of the file at `path` from its first `SNIFF_LEN` bytes.
pub fn sniff_file(path: &Path) -> io::Result<&'static str> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN + 1);
    file.take(SNIFF_LEN as u64 + 1).read_to_end(&mut head)?;
    let truncated = head.len() > SNIFF_LEN;
    head.truncate(SNIFF_LEN);
    Ok(sniff_bytes(&head, truncated))
}

/// Detect the MIME type of a byte sample. `truncated` marks a sample that is
/// only the start of a longer file.
pub fn sniff_bytes(head: &[u8], truncated: bool) -> &'static str {
    if head.is_empty() {
        return EMPTY;
    }
    if let Some(mime) = sniff_signature(head) {
        return mime;
    }
    match decode_text(head, truncated) {
        Ok(decoded) if looks_textual(&decoded.text) => sniff_text(&decoded.text, truncated),
        _ => OCTET_STREAM,
    }
}

fn sniff_signature(head: &[u8]) -> Option<&'static str> {
    let mime = match head {
        [b'%', b'P', b'D', b'F', b'-', ..] => "application/pdf",
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/x-wav",
        [b'B', b'M', _, _, _, _, 0, 0, 0, 0, ..] => "image/bmp",
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => "image/tiff",
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB | 0xF3 | 0xF2, ..] => "audio/mpeg",
        [_, _, _, _, b'f', b't', b'y', b'p', b'M', b'4', b'A', ..] => "audio/mp4",
        [_, _, _, _, b'f', b't', b'y', b'p', b'q', b't', ..] => "video/quicktime",
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => "video/mp4",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [b'P', b'K', 0x03, 0x04, ..] => sniff_zip(head),
        [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, ..] => "application/vnd.ms-office",
        [b'{', b'\\', b'r', b't', b'f', ..] => "text/rtf",
        [0x1F, 0x8B, ..] => "application/gzip",
        _ => return None,
    };
    Some(mime)
}

/// OOXML and EPUB containers are zip archives; tell them apart by entry names.
fn sniff_zip(head: &[u8]) -> &'static str {
    if head.get(30..58) == Some(b"mimetypeapplication/epub+zip".as_slice()) {
        return "application/epub+zip";
    }
    if contains(head, b"word/") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if contains(head, b"ppt/") {
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    } else if contains(head, b"xl/") {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    } else {
        "application/zip"
    }
}

fn looks_textual(text: &str) -> bool {
    !text
        .chars()
        .any(|c| c < ' ' && !matches!(c, '\t' | '\n' | '\r' | '\x0C' | '\x1B'))
}

fn sniff_text(text: &str, truncated: bool) -> &'static str {
    let trimmed = text.trim_start_matches('\u{FEFF}').trim_start();
    let lead: String = trimmed.chars().take(1024).collect::<String>().to_ascii_lowercase();

    if lead.starts_with("<?xml") {
        return if lead.contains("<html") {
            "text/html"
        } else if lead.contains("<svg") {
            "image/svg+xml"
        } else {
            "text/xml"
        };
    }
    if lead.starts_with("<!doctype html")
        || lead.starts_with("<html")
        || lead.starts_with("<head")
        || lead.starts_with("<body")
        || lead.contains("<html")
    {
        return "text/html";
    }
    if lead.starts_with("<svg") {
        return "image/svg+xml";
    }
    if looks_like_json(trimmed, truncated) {
        return "application/json";
    }
    "text/plain"
}

fn looks_like_json(text: &str, truncated: bool) -> bool {
    if !(text.starts_with('{') || text.starts_with('[')) {
        return false;
    }
    if truncated {
        let after = text[1..].trim_start();
        return after.starts_with('"') || after.starts_with('{') || after.starts_with('[');
    }
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
