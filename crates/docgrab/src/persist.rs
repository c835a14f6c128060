//! Page persister
//!
//! Derives a deterministic, collision-resistant filename from a page URL
//! and writes the content to disk. The filename carries the sanitized
//! domain, path segments, and fragment for readability, plus a short
//! digest of the full URL so distinct URLs that sanitize to the same stem
//! never share a file. Re-saving the same URL overwrites its file.

use crate::error::Error;
use crate::extract::ExtractedDoc;
use crate::types::{Page, PageFormat};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Hex characters of the URL digest kept in the filename
const HASH_LEN: usize = 8;

/// Maximum length of the sanitized stem, before the digest suffix
const MAX_STEM_LEN: usize = 80;

/// Derive the persisted filename for a URL
///
/// Shape: `<domain>-<path-segments>[-<fragment>]-<hash>.<extension>`.
/// Deterministic for the same URL; distinct for distinct URLs up to the
/// birthday bound of the digest width.
pub fn filename_for_url(url: &str, extension: &str) -> String {
    let (domain, path, fragment) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or("unknown").to_string(),
            percent_decode(parsed.path()),
            parsed.fragment().map(percent_decode),
        ),
        // Unparseable input still gets a stable name; the digest does the
        // disambiguation.
        Err(_) => ("unknown".to_string(), url.to_string(), None),
    };

    let mut stem = sanitize(&domain);
    if stem.is_empty() {
        stem.push_str("unknown");
    }
    let path_part = sanitize(&path);
    if path_part.is_empty() {
        stem.push_str("-index");
    } else {
        stem.push('-');
        stem.push_str(&path_part);
    }
    if let Some(fragment) = fragment {
        let fragment_part = sanitize(&fragment);
        if !fragment_part.is_empty() {
            stem.push('-');
            stem.push_str(&fragment_part);
        }
    }
    stem.truncate(MAX_STEM_LEN);
    let stem = stem.trim_end_matches(['-', '_']);

    format!("{stem}-{}.{extension}", url_digest(url))
}

/// Write a page under `output_dir`, creating the directory if absent
///
/// Returns the path written. Writes are not transactional; a crash
/// mid-write can leave a truncated file. IO failures are reported and not
/// retried here.
pub fn save_page(page: &Page, output_dir: &Path) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(output_dir).map_err(|source| Error::Filesystem {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let filename = filename_for_url(&page.url, page.format.extension());
    let path = output_dir.join(filename);

    let body = render_body(page);
    std::fs::write(&path, body).map_err(|source| Error::Filesystem {
        path: path.clone(),
        source,
    })?;

    info!(url = %page.url, path = %path.display(), "Saved page");
    Ok(path)
}

/// Write an extracted document under `output_dir`, creating it if absent
///
/// Extract-job documents carry plain extracted text, so they persist as
/// `.txt` with the same title/source preamble and overwrite semantics as
/// [`save_page`].
pub fn save_document(doc: &ExtractedDoc, output_dir: &Path) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(output_dir).map_err(|source| Error::Filesystem {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let filename = filename_for_url(&doc.url, "txt");
    let path = output_dir.join(filename);

    let body = format!("# {}\n\nURL: {}\n\n{}", doc.title, doc.url, doc.content);
    std::fs::write(&path, body).map_err(|source| Error::Filesystem {
        path: path.clone(),
        source,
    })?;

    info!(url = %doc.url, path = %path.display(), "Saved document");
    Ok(path)
}

/// Content with a title/source preamble matching the format
fn render_body(page: &Page) -> String {
    match page.format {
        PageFormat::Markdown => format!(
            "# {}\n\nURL: {}\n\n{}",
            page.title, page.url, page.content
        ),
        PageFormat::Html | PageFormat::RawHtml => format!(
            "<h1>{}</h1>\n<p>URL: {}</p>\n{}",
            page.title, page.url, page.content
        ),
        PageFormat::Links => format!("URL: {}\n\n{}", page.url, page.content),
    }
}

/// Replace everything outside `[A-Za-z0-9._-]` and collapse the runs
fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_sep = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Short hex digest of the full URL string
fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(HASH_LEN);
    for byte in digest.iter().take(HASH_LEN / 2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Decode %XX escapes, keeping invalid escapes verbatim
fn percent_decode(input: &str) -> String {
    fn hex_value(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
