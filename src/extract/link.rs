use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Provider family a harvested link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkCategory {
    Baidu,
    Aliyun,
    Quark,
    Tianyi,
    Uc,
    Mobile,
    Cloud115,
    Pikpak,
    Xunlei,
    Cloud123,
    Magnet,
    Ed2k,
    /// `scheme://host/s/token` on a host outside the curated catalog.
    GenericPathShare,
}

impl LinkCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkCategory::Baidu => "baidu",
            LinkCategory::Aliyun => "aliyun",
            LinkCategory::Quark => "quark",
            LinkCategory::Tianyi => "tianyi",
            LinkCategory::Uc => "uc",
            LinkCategory::Mobile => "mobile",
            LinkCategory::Cloud115 => "cloud115",
            LinkCategory::Pikpak => "pikpak",
            LinkCategory::Xunlei => "xunlei",
            LinkCategory::Cloud123 => "cloud123",
            LinkCategory::Magnet => "magnet",
            LinkCategory::Ed2k => "ed2k",
            LinkCategory::GenericPathShare => "generic-path-share",
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link string exactly as it appeared in feed text, tagged with the
/// provider family of the grammar that first matched it.
///
/// Identity is the literal string: two candidates with the same text are
/// equal even if different grammars produced them. Nothing is normalized,
/// so case and trailing characters are kept as matched.
#[derive(Debug, Clone)]
pub struct CandidateLink {
    url: String,
    category: LinkCategory,
}

impl CandidateLink {
    pub fn new(url: impl Into<String>, category: LinkCategory) -> Self {
        Self {
            url: url.into(),
            category,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn category(&self) -> LinkCategory {
        self.category
    }

    pub fn into_string(self) -> String {
        self.url
    }
}

impl PartialEq for CandidateLink {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for CandidateLink {}

impl Hash for CandidateLink {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl PartialOrd for CandidateLink {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidateLink {
    fn cmp(&self, other: &Self) -> Ordering {
        self.url.cmp(&other.url)
    }
}

impl fmt::Display for CandidateLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl AsRef<str> for CandidateLink {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
