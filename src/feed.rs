//! Feed normalization: RSS 2.0 and Atom shapes to uniform candidates.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::tree::{as_list, attr, text_of};

/// Raw record pulled from the feed before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub date: Option<String>,
}

/// Extract candidates from a parsed feed tree.
///
/// RSS items come from `rss > channel > item`, Atom entries from
/// `feed > entry`. When a document carries both, the Atom list replaces the
/// RSS one. A document with neither yields no candidates.
pub fn extract_candidates(tree: &JsonValue) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    let rss_items = tree
        .get("rss")
        .and_then(|rss| rss.get("channel"))
        .and_then(|channel| channel.get("item"));
    if rss_items.is_some() {
        candidates = as_list(rss_items).into_iter().map(rss_candidate).collect();
        debug!("found {} RSS items", candidates.len());
    }

    let atom_entries = tree.get("feed").and_then(|feed| feed.get("entry"));
    if atom_entries.is_some() {
        candidates = as_list(atom_entries).into_iter().map(atom_candidate).collect();
        debug!("found {} Atom entries", candidates.len());
    }

    candidates
}

fn field(node: &JsonValue, name: &str) -> Option<String> {
    node.get(name).and_then(text_of).map(str::to_string)
}

/// First non-empty field among `names`.
fn first_field(node: &JsonValue, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| field(node, name))
        .find(|v| !v.trim().is_empty())
}

fn rss_candidate(item: &JsonValue) -> Candidate {
    Candidate {
        title: field(item, "title"),
        url: field(item, "link"),
        date: first_field(item, &["pubDate", "date", "dc:date"]),
    }
}

fn atom_candidate(entry: &JsonValue) -> Candidate {
    Candidate {
        title: field(entry, "title"),
        url: atom_link(entry),
        date: first_field(entry, &["published", "updated"]),
    }
}

/// href of the `alternate` link, else of the first link.
fn atom_link(entry: &JsonValue) -> Option<String> {
    let links = as_list(entry.get("link"));
    links
        .iter()
        .find(|link| attr(link, "rel") == Some("alternate"))
        .and_then(|link| attr(link, "href"))
        .filter(|href| !href.is_empty())
        .or_else(|| links.first().and_then(|link| attr(link, "href")))
        .map(str::to_string)
}
