//! Favicon candidate collection and ranking.

use std::cmp::Reverse;

/// Size up to which an icon's edge length counts at face value.
const PREFERRED_MAX_SIZE: i64 = 128;

/// One `<link rel="...icon...">` found while parsing a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconCandidate {
    pub href: String,
    /// Edge length in pixels from `sizes="WxH"`, 0 when unknown.
    pub size: u32,
    /// 3 for svg, 2 for png, 1 for ico and anything else.
    pub priority: u8,
    pub rel: String,
}

impl FaviconCandidate {
    pub fn from_link(href: &str, rel: &str, sizes: &str, mime_type: &str) -> Self {
        Self {
            href: href.to_string(),
            size: parse_size(sizes),
            priority: format_priority(href, mime_type),
            rel: rel.to_string(),
        }
    }

    /// Ranking key: format priority first, then a size score that prefers
    /// mid-sized icons and penalizes very large ones.
    pub fn score(&self) -> (u8, i64) {
        let size = i64::from(self.size);
        let size_score = if size > PREFERRED_MAX_SIZE {
            PREFERRED_MAX_SIZE - (size - PREFERRED_MAX_SIZE) / 10
        } else {
            size
        };
        (self.priority, size_score)
    }
}

/// Width component of a `sizes` attribute such as `96x96`.
///
/// Only the first listed size is considered; `any` and garbage yield 0.
fn parse_size(sizes: &str) -> u32 {
    let sizes = sizes.trim().to_ascii_lowercase();
    match sizes.split_once('x') {
        Some((width, _)) => width.trim().parse().unwrap_or(0),
        None => 0,
    }
}

fn format_priority(href: &str, mime_type: &str) -> u8 {
    let href = href.to_ascii_lowercase();
    let mime_type = mime_type.to_ascii_lowercase();
    if href.contains(".svg") || mime_type.contains("svg") {
        3
    } else if href.contains(".png") || mime_type.contains("png") {
        2
    } else {
        1
    }
}

/// Pick the best icon, or `fallback` when nothing was collected.
///
/// Among equal scores the candidate seen first in the document wins.
pub fn best_favicon(candidates: &[FaviconCandidate], fallback: &str) -> String {
    candidates
        .iter()
        .enumerate()
        .max_by_key(|(index, candidate)| (candidate.score(), Reverse(*index)))
        .map(|(_, candidate)| candidate.href.clone())
        .unwrap_or_else(|| fallback.to_string())
}
