//! Static grammar catalog for the extraction passes.
//!
//! Every recognized link shape lives in one of three tables:
//!
//! - [`GRAMMAR_TABLE`] - per-provider share grammars, tagged with the shape
//!   that decides which pass runs them
//! - [`PROVIDER_TOKENS`] - host names and display labels used by the
//!   domain-fallback pass
//! - [`PROTOCOL_TABLE`] - the wide magnet/ed2k grammars
//!
//! Patterns are compiled once, on first use, with ASCII-only case folding.
//! Unicode matching is switched back on with `(?u:...)` only where a grammar
//! deliberately accepts non-ASCII text (ed2k file names, magnet parameters,
//! display labels).
//!
//! Token characters are ASCII-only (`[0-9A-Za-z_\-]`) so a link glued to
//! CJK text such as `.../s/1abc提取码` stops at the last ASCII character,
//! and look-alikes such as the Kelvin sign never fold into a token.

use super::link::LinkCategory;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Which extraction pass a catalog grammar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// `scheme://known-host/s/token` style share, run in the path-anchored pass
    /// and again in the full catalog pass.
    PathShare,
    /// The host-agnostic `/s/` fallback; path-anchored pass only.
    GenericPathShare,
    /// Query-string shares, `/t/` paths, API paths and catalog protocol links;
    /// full catalog pass only.
    Other,
}

pub(crate) struct GrammarSpec {
    pub category: LinkCategory,
    pub shape: Shape,
    pub pattern: &'static str,
}

const fn grammar(category: LinkCategory, shape: Shape, pattern: &'static str) -> GrammarSpec {
    GrammarSpec {
        category,
        shape,
        pattern,
    }
}

pub(crate) const GRAMMAR_TABLE: &[GrammarSpec] = &[
    grammar(
        LinkCategory::Baidu,
        Shape::PathShare,
        r"(https?://pan\.baidu\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Baidu,
        Shape::PathShare,
        r"(https?://yun\.baidu\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Aliyun,
        Shape::PathShare,
        r"(https?://www\.aliyundrive\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Aliyun,
        Shape::PathShare,
        r"(https?://aliyundrive\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Quark,
        Shape::PathShare,
        r"(https?://(?:pan\.)?quark\.cn/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Uc,
        Shape::PathShare,
        r"(https?://drive\.uc\.cn/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Cloud115,
        Shape::PathShare,
        r"(https?://115cdn\.com/s/[0-9A-Za-z_\-]+(\?password=[0-9A-Za-z_\-]+)?#?)",
    ),
    grammar(
        LinkCategory::Pikpak,
        Shape::PathShare,
        r"(https?://pikpak\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Xunlei,
        Shape::PathShare,
        r"(https?://pan\.xunlei\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Cloud123,
        Shape::PathShare,
        r"(https?://www\.123pan\.com/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::GenericPathShare,
        Shape::GenericPathShare,
        r"(https?://(?:[0-9A-Za-z_\-]+\.)+[0-9A-Za-z_\-]+/s/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Tianyi,
        Shape::Other,
        r"(https?://cloud\.189\.cn/web/share\?code=[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Tianyi,
        Shape::Other,
        r"(https?://cloud\.189\.cn/t/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Mobile,
        Shape::Other,
        r"(https?://cloud\.10086\.cn/t/[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Cloud115,
        Shape::Other,
        r"(https?://115\.com/lb/\?s=[0-9A-Za-z_\-]+)",
    ),
    grammar(
        LinkCategory::Pikpak,
        Shape::Other,
        r"(https?://api\.pikpak\.com/drive/v1/files/[0-9A-Za-z_\-]+/share)",
    ),
    grammar(
        LinkCategory::Magnet,
        Shape::Other,
        r"(magnet:\?xt=urn:btih:[0-9a-f]{40}(&[0-9A-Za-z_\-=.%+]+)*)",
    ),
    grammar(
        LinkCategory::Ed2k,
        Shape::Other,
        r"(ed2k://\|file\|(?u:[^|\r\n]+)\|[0-9]+\|[0-9a-f]{32}\|/)",
    ),
];

/// Host names and display labels identifying a provider in free text.
///
/// Magnet and ed2k are absent: a URI scheme is their only identifying token
/// and [`PROTOCOL_TABLE`] covers them.
pub(crate) struct ProviderTokens {
    pub category: LinkCategory,
    pub hosts: &'static [&'static str],
    pub labels: &'static [&'static str],
}

pub(crate) const PROVIDER_TOKENS: &[ProviderTokens] = &[
    ProviderTokens {
        category: LinkCategory::Baidu,
        hosts: &["pan.baidu.com", "yun.baidu.com"],
        labels: &["百度网盘"],
    },
    ProviderTokens {
        category: LinkCategory::Aliyun,
        hosts: &["aliyundrive.com"],
        labels: &["阿里云盘"],
    },
    ProviderTokens {
        category: LinkCategory::Quark,
        hosts: &["quark.cn"],
        labels: &["夸克网盘"],
    },
    ProviderTokens {
        category: LinkCategory::Tianyi,
        hosts: &["cloud.189.cn"],
        labels: &["天翼云盘"],
    },
    ProviderTokens {
        category: LinkCategory::Uc,
        hosts: &["drive.uc.cn"],
        labels: &["UC网盘"],
    },
    ProviderTokens {
        category: LinkCategory::Mobile,
        hosts: &["cloud.10086.cn"],
        labels: &["移动云盘"],
    },
    ProviderTokens {
        category: LinkCategory::Cloud115,
        hosts: &["115.com", "115cdn.com"],
        labels: &["115网盘"],
    },
    ProviderTokens {
        category: LinkCategory::Pikpak,
        hosts: &["pikpak.com"],
        labels: &[],
    },
    ProviderTokens {
        category: LinkCategory::Xunlei,
        hosts: &["pan.xunlei.com"],
        labels: &["迅雷网盘"],
    },
    ProviderTokens {
        category: LinkCategory::Cloud123,
        hosts: &["123pan.com"],
        labels: &["123网盘"],
    },
];

pub(crate) const PROTOCOL_TABLE: &[(LinkCategory, &str)] = &[
    (
        LinkCategory::Magnet,
        r"(magnet:\?xt=urn:btih:[0-9a-f]{40}(?:&(?u:[^\s&<>'\x22]+))*)",
    ),
    (
        LinkCategory::Ed2k,
        r"(ed2k://\|file\|(?u:[^|\r\n]+)\|[0-9]+\|[0-9a-f]{32}\|/)",
    ),
];

/// Path or query after the anchor in a domain-fallback match. At least one
/// character must follow the separator: a bare `scheme://host` is a
/// homepage, not a resource.
const URL_TAIL: &str = r"[/?#][0-9A-Za-z_\-/.?&=%#]+";

pub(crate) struct CompiledGrammar {
    pub category: LinkCategory,
    pub shape: Shape,
    pub regex: Regex,
}

pub(crate) enum AnchorKind {
    /// ASCII host name; the match must end on a host boundary.
    Host,
    /// Non-ASCII display label found inside an internationalized host.
    Label,
}

pub(crate) struct DomainAnchor {
    pub category: LinkCategory,
    pub kind: AnchorKind,
    /// Lowercased token that must occur in the text before the regex runs.
    pub token: String,
    pub regex: Regex,
}

pub(crate) static GRAMMARS: LazyLock<Vec<CompiledGrammar>> = LazyLock::new(|| {
    GRAMMAR_TABLE
        .iter()
        .map(|spec| CompiledGrammar {
            category: spec.category,
            shape: spec.shape,
            regex: compile(spec.pattern),
        })
        .collect()
});

pub(crate) static DOMAIN_ANCHORS: LazyLock<Vec<DomainAnchor>> = LazyLock::new(|| {
    let mut anchors = Vec::new();
    for provider in PROVIDER_TOKENS {
        for host in provider.hosts {
            let pattern = format!(
                r"(https?://(?:[0-9A-Za-z_\-]+\.)*{}{URL_TAIL})",
                regex::escape(host)
            );
            anchors.push(DomainAnchor {
                category: provider.category,
                kind: AnchorKind::Host,
                token: host.to_lowercase(),
                regex: compile(&pattern),
            });
        }
        for label in provider.labels {
            // Only the non-ASCII part can appear inside an IDN host
            let core: String = label.chars().filter(|c| !c.is_ascii()).collect();
            if core.is_empty() {
                continue;
            }
            let pattern = format!(
                r"(https?://[0-9A-Za-z_\-.]*(?u:{}[^\s/?#<>'\x22，。：；！？（）【】、]*){URL_TAIL})",
                regex::escape(&core)
            );
            anchors.push(DomainAnchor {
                category: provider.category,
                kind: AnchorKind::Label,
                token: label.to_lowercase(),
                regex: compile(&pattern),
            });
        }
    }
    anchors
});

pub(crate) static PROTOCOLS: LazyLock<Vec<(LinkCategory, Regex)>> = LazyLock::new(|| {
    PROTOCOL_TABLE
        .iter()
        .map(|(category, pattern)| (*category, compile(pattern)))
        .collect()
});

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(false)
        .build()
        .unwrap_or_else(|e| panic!("invalid link grammar {pattern:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_compiles() {
        assert_eq!(GRAMMARS.len(), GRAMMAR_TABLE.len());
        assert_eq!(PROTOCOLS.len(), PROTOCOL_TABLE.len());
        assert!(!DOMAIN_ANCHORS.is_empty());
    }

    #[test]
    fn test_scheme_only_providers_have_no_domain_anchor() {
        assert!(DOMAIN_ANCHORS
            .iter()
            .all(|a| !matches!(a.category, LinkCategory::Magnet | LinkCategory::Ed2k)));
    }

    #[test]
    fn test_generic_grammar_is_last_path_share() {
        let generic: Vec<_> = GRAMMAR_TABLE
            .iter()
            .filter(|g| g.shape == Shape::GenericPathShare)
            .collect();
        assert_eq!(generic.len(), 1);
        assert_eq!(generic[0].category, LinkCategory::GenericPathShare);
    }

    #[test]
    fn test_label_anchor_uses_non_ascii_core() {
        let uc = DOMAIN_ANCHORS
            .iter()
            .find(|a| matches!(a.kind, AnchorKind::Label) && a.category == LinkCategory::Uc)
            .unwrap();
        assert_eq!(uc.token, "uc网盘");
        assert!(uc.regex.is_match("https://share.网盘.cn/abc"));
    }

    #[test]
    fn test_domain_anchor_requires_tail() {
        let baidu = DOMAIN_ANCHORS
            .iter()
            .find(|a| a.token == "pan.baidu.com")
            .unwrap();
        assert!(!baidu.regex.is_match("https://pan.baidu.com"));
        assert!(!baidu.regex.is_match("https://pan.baidu.com/"));
        assert!(baidu.regex.is_match("https://pan.baidu.com/share/init"));
    }

    #[test]
    fn test_ascii_classes_ignore_unicode_case_folds() {
        // U+212A KELVIN SIGN folds to 'k', U+017F LONG S folds to 's'
        let baidu = &GRAMMARS[0].regex;
        let m = baidu.find("https://pan.baidu.com/s/1ab\u{212A}\u{17F}").unwrap();
        assert_eq!(m.as_str(), "https://pan.baidu.com/s/1ab");
        assert!(!baidu.is_match("https://pan.baidu.com/\u{17F}/1ab"));
    }
}
