use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use folio_types::{Link, Project};
use regex::Regex;
use url::Url;

/// Markdown labels that say nothing about the target; links carrying them are
/// shown by hostname instead.
pub const GENERIC_LABELS: [&str; 8] = ["here", "link", "this", "repo", "live", "website", "demo", "view"];

// Markdown link (label, url) or a bare http(s) URL, in order of appearance.
// Bare URLs may contain balanced `(...)` groups; an unmatched `)` ends them.
static LINK_OR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)|(https?://(?:[^\s<>()\[\]{}]|\([^\s<>()\[\]{}]*\))+)")
        .expect("valid url pattern")
});

const TRAILING_PUNCTUATION: [char; 9] = ['.', ',', ';', ':', '!', '?', '\'', '"', '*'];

/// Strip sentence punctuation and a closing `__` underline from a bare URL.
/// A single trailing `_` belongs to the URL.
fn trim_bare_url(mut url: &str) -> &str {
    loop {
        let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
        let trimmed = trimmed.strip_suffix("__").unwrap_or(trimmed);
        if trimmed.len() == url.len() {
            return trimmed;
        }
        url = trimmed;
    }
}

/// Exact-URL lookup of project link labels (`"<name> — <Kind>"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkLabels {
    by_url: HashMap<String, String>,
}

impl LinkLabels {
    /// The first project claiming a URL provides its label.
    pub fn from_projects(projects: &[Project]) -> Self {
        let mut by_url = HashMap::new();
        for project in projects {
            for (kind, url) in &project.links {
                by_url
                    .entry(url.trim().to_owned())
                    .or_insert_with(|| format!("{} — {}", project.name, capitalize(kind)));
            }
        }
        Self { by_url }
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.by_url.get(url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_generic(label: &str) -> bool {
    GENERIC_LABELS.iter().any(|g| label.eq_ignore_ascii_case(g))
}

/// The trimmed URL when it is an absolute `http`/`https` URL with a host.
pub fn accept_url(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    let parsed = Url::parse(trimmed).ok()?;
    let web = matches!(parsed.scheme(), "http" | "https");
    (web && parsed.host_str().is_some()).then_some(trimmed)
}

/// Collect the distinct links in a reply, first occurrence first.
pub fn extract_links(text: &str, labels: &LinkLabels) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in LINK_OR_URL.captures_iter(text) {
        let (candidate, markdown_label) = match (caps.get(2), caps.get(3)) {
            (Some(url), _) => (url.as_str(), caps.get(1).map(|m| m.as_str().trim())),
            (None, Some(bare)) => (trim_bare_url(bare.as_str()), None),
            (None, None) => continue,
        };

        let Some(url) = accept_url(candidate) else { continue };
        if !seen.insert(url.to_owned()) {
            continue;
        }

        let label = labels.get(url).map(str::to_owned).or_else(|| {
            markdown_label
                .filter(|l| !l.is_empty() && !is_generic(l))
                .map(str::to_owned)
        });
        links.push(Link { url: url.to_owned(), label });
    }

    links
}

/// What a link button shows: its label, else the bare hostname, else the URL.
pub fn display_label(link: &Link) -> String {
    if let Some(label) = link.label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        return label.to_owned();
    }
    Url::parse(&link.url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h).to_owned()))
        .unwrap_or_else(|| link.url.clone())
}
