//! Link extraction engine.
//!
//! Turns free feed text into a set of [`CandidateLink`]s by running four
//! passes over the same input, all feeding one output set:
//!
//! 1. **Path-anchored**: curated `host/s/token` share grammars, then the
//!    host-agnostic `/s/` fallback
//! 2. **Full catalog**: every per-provider grammar, including query-string,
//!    `/t/` and API share shapes plus the catalog magnet/ed2k grammars
//! 3. **Domain fallback**: for each provider token present in the text, a
//!    greedy URL match anchored at that host or label, skipped where passes
//!    1-2 already matched; a bare homepage with no path or query is ignored
//! 4. **Protocol**: wide magnet and ed2k grammars, independent of the catalog
//!
//! Identical strings from different passes collapse in the set; the first
//! grammar to produce a string decides its category. A catalog match that is
//! a strict prefix of a protocol match at the same position (a magnet cut off
//! at `&tr=udp://`) is dropped in favor of the longer form.
//!
//! # Example
//!
//! ```
//! use linkharvest::extract::extract;
//!
//! let links = extract("share: https://pan.baidu.com/s/1abcXYZ more text");
//! assert_eq!(links.len(), 1);
//! ```

mod catalog;
mod link;

pub use link::{CandidateLink, LinkCategory};

use catalog::{AnchorKind, Shape, DOMAIN_ANCHORS, GRAMMARS, PROTOCOLS};
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;

/// Extracts every recognized link from `text`.
///
/// Never fails: a grammar with no match contributes nothing.
pub fn extract(text: &str) -> HashSet<CandidateLink> {
    let mut links = HashSet::new();
    if text.is_empty() {
        return links;
    }

    let mut covered: Vec<Range<usize>> = Vec::new();

    let protocol_hits: Vec<(LinkCategory, Range<usize>)> = PROTOCOLS
        .iter()
        .flat_map(|(category, regex)| {
            regex
                .captures_iter(text)
                .filter_map(|caps| first_non_empty_group(&caps).map(|m| (*category, m.range())))
        })
        .collect();

    // Pass 1: path-anchored shares, curated hosts before the generic fallback
    for grammar in GRAMMARS
        .iter()
        .filter(|g| matches!(g.shape, Shape::PathShare | Shape::GenericPathShare))
    {
        collect(&grammar.regex, grammar.category, text, &mut links, |m| {
            covered.push(m);
            true
        });
    }

    // Pass 2: the full per-provider catalog
    for grammar in GRAMMARS
        .iter()
        .filter(|g| matches!(g.shape, Shape::PathShare | Shape::Other))
    {
        collect(&grammar.regex, grammar.category, text, &mut links, |m| {
            let superseded = protocol_hits
                .iter()
                .any(|(_, p)| p.start == m.start && m.end < p.end);
            covered.push(m);
            !superseded
        });
    }

    // Pass 3: domain fallback, only for tokens that actually occur
    let lowered = text.to_lowercase();
    for anchor in DOMAIN_ANCHORS.iter() {
        if !lowered.contains(&anchor.token) {
            continue;
        }
        for caps in anchor.regex.captures_iter(text) {
            let Some(m) = first_non_empty_group(&caps) else {
                continue;
            };
            if covered.iter().any(|span| span.contains(&m.start())) {
                continue;
            }
            if matches!(anchor.kind, AnchorKind::Host) && !ends_on_host_boundary(text, m.end()) {
                continue;
            }
            let candidate = m.as_str().trim_end_matches('.');
            if has_resource_tail(candidate) {
                links.insert(CandidateLink::new(candidate, anchor.category));
            }
        }
    }

    // Pass 4: wide protocol grammars
    for (category, span) in protocol_hits {
        links.insert(CandidateLink::new(&text[span], category));
    }

    links
}

/// Runs one grammar over `text`, inserting every accepted match.
///
/// `accept` sees the byte span of each match and may veto it.
fn collect(
    regex: &Regex,
    category: LinkCategory,
    text: &str,
    links: &mut HashSet<CandidateLink>,
    mut accept: impl FnMut(Range<usize>) -> bool,
) {
    for caps in regex.captures_iter(text) {
        let Some(m) = first_non_empty_group(&caps) else {
            continue;
        };
        if accept(m.range()) {
            links.insert(CandidateLink::new(m.as_str(), category));
        }
    }
}

/// The first non-empty capture group, or the whole match for group-less
/// patterns.
fn first_non_empty_group<'t>(caps: &regex::Captures<'t>) -> Option<regex::Match<'t>> {
    if caps.len() == 1 {
        return caps.get(0).filter(|m| !m.as_str().is_empty());
    }
    caps.iter().skip(1).flatten().find(|m| !m.as_str().is_empty())
}

/// True when something other than separators follows the host, e.g.
/// `https://host/share/1` but not `https://host/` or `https://host/?`.
fn has_resource_tail(candidate: &str) -> bool {
    let Some((_, rest)) = candidate.split_once("://") else {
        return false;
    };
    match rest.find(['/', '?', '#']) {
        Some(sep) => rest[sep..].chars().any(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

/// A host anchor must not be the prefix of a longer label (`115.com` inside
/// `115.community`).
fn ends_on_host_boundary(text: &str, end: usize) -> bool {
    match text[end..].chars().next() {
        Some(c) => !(c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        None => true,
    }
}
