// src/ingest/mod.rs
//! Decoding of the community read API (listings, search, comment threads)
//! into `RawItem`s, plus text normalisation and endpoint URL builders.

use crate::analyze::text::sentences;
use crate::model::RawItem;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const API_BASE: &str = "https://www.reddit.com";

/// Hard cap on normalised text length (chars).
pub const MAX_TEXT_CHARS: usize = 10_000;
/// Comment titles are cut to this many chars.
pub const COMMENT_TITLE_CHARS: usize = 80;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_COMMUNITY_BAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());

/// Normalize text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, "");
    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let out = RE_WS.replace_all(&quoted, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out.chars().take(MAX_TEXT_CHARS).collect()
    } else {
        out
    }
}

/// Short stable id for logs; never log the handle or text itself.
pub fn anon_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Community names may hold word chars, whitespace and `-` only.
pub fn is_valid_community(name: &str) -> bool {
    !name.trim().is_empty() && !RE_COMMUNITY_BAD.is_match(name)
}

pub fn permalink_url(permalink: &str) -> String {
    let p = permalink.trim();
    if p.is_empty() || p.starts_with("http://") || p.starts_with("https://") {
        p.to_string()
    } else if p.starts_with('/') {
        format!("{API_BASE}{p}")
    } else {
        format!("{API_BASE}/{p}")
    }
}

/// Search endpoint for one community. `None` when the community name is refused.
pub fn search_url(community: &str, query: &str, limit: u32) -> Option<String> {
    if !is_valid_community(community) {
        return None;
    }
    let base = format!("{API_BASE}/r/{}/search.json", community.trim());
    let limit = limit.clamp(1, 100).to_string();
    reqwest::Url::parse_with_params(
        &base,
        &[
            ("q", query),
            ("restrict_sr", "1"),
            ("sort", "relevance"),
            ("t", "year"),
            ("limit", limit.as_str()),
        ],
    )
    .ok()
    .map(String::from)
}

/// Comment thread endpoint for one post.
pub fn comments_url(community: &str, post_id: &str) -> Option<String> {
    if !is_valid_community(community) || post_id.trim().is_empty() {
        return None;
    }
    let id = post_id.trim().trim_start_matches("t3_");
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!("{API_BASE}/r/{}/comments/{id}.json", community.trim()))
}

/// Items of a `Listing` (`data.children[].data`). Undecodable children are skipped.
pub fn parse_listing(v: &Value) -> Vec<RawItem> {
    v.pointer("/data/children")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter(|c| c.get("kind").and_then(Value::as_str) != Some("more"))
                .filter_map(|c| c.get("data"))
                .filter_map(|d| serde_json::from_value::<RawItem>(d.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// First sentence of a comment body, at most `COMMENT_TITLE_CHARS` chars.
pub fn comment_title(body: &str) -> String {
    let text = normalize_text(body);
    let first = sentences(&text).first().copied().unwrap_or("").to_string();
    if first.chars().count() > COMMENT_TITLE_CHARS {
        first.chars().take(COMMENT_TITLE_CHARS).collect()
    } else {
        first
    }
}

fn flatten_comments(listing: &Value, depth: u32, parent: Option<&str>, out: &mut Vec<RawItem>) {
    let Some(children) = listing.pointer("/data/children").and_then(Value::as_array) else {
        return;
    };
    for child in children {
        if child.get("kind").and_then(Value::as_str) != Some("t1") {
            continue;
        }
        let Some(data) = child.get("data") else { continue };
        let Ok(mut item) = serde_json::from_value::<RawItem>(data.clone()) else {
            continue;
        };
        item.depth = depth;
        if item.parent_id.is_none() {
            item.parent_id = parent.map(str::to_string);
        }
        if item.title.trim().is_empty() {
            item.title = comment_title(&item.body);
        }
        let fullname = format!("t1_{}", item.id);
        out.push(item);
        if let Some(replies) = data.get("replies").filter(|r| r.is_object()) {
            flatten_comments(replies, depth + 1, Some(&fullname), out);
        }
    }
}

/// A thread payload is `[post listing, comment listing]`. Comments come back
/// flattened depth-first with `depth` and `parent_id` set.
pub fn parse_thread(v: &Value) -> (Option<RawItem>, Vec<RawItem>) {
    let Some(parts) = v.as_array() else {
        return (None, Vec::new());
    };
    let post = parts.first().and_then(|p| parse_listing(p).into_iter().next());
    let mut comments = Vec::new();
    if let Some(listing) = parts.get(1) {
        let root = post.as_ref().map(|p| format!("t3_{}", p.id));
        flatten_comments(listing, 0, root.as_deref(), &mut comments);
    }
    (post, comments)
}
