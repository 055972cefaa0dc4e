// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors are turned into [`ConfigError`] values that know which
//! flowtab section they belong to, point at the offending line of
//! `flowtab.toml` when the file is available, and suggest the closest known
//! key for typos.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::ops::Range;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Every section of `flowtab.toml` and the keys it accepts.
pub const SECTIONS: &[(&str, &[&str])] = &[
    ("app", &["name", "log_level"]),
    ("storage", &["database_path", "wal_mode"]),
    ("vault", &["encryption_key"]),
    (
        "monetization",
        &[
            "monthly_copy_cap",
            "payout_rate_cents",
            "over_quota",
            "payout_history_limit",
        ],
    ),
];

/// Jaro-Winkler score below which no suggestion is offered.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration problem, renderable by miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(section.as_deref()))]
    #[diagnostic(
        code(flowtab::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// `None` for a top-level (section) name.
        section: Option<String>,
        suggestion: Option<String>,
        /// Comma-separated keys accepted where `key` appeared.
        valid_keys: String,
        #[label("not a flowtab setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(flowtab::config::invalid_type), help("`{key}` expects {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `monetization.monthly_copy_cap`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(flowtab::config::missing_key),
        help("add `{key} = <value>` to flowtab.toml")
    )]
    MissingKey { key: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(flowtab::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(flowtab::config::other))]
    Other(String),
}

fn section_label(section: Option<&str>) -> String {
    match section {
        Some(s) => format!("[{s}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Keys accepted in `section`, or the section names for the top level.
pub fn keys_for(section: Option<&str>) -> Vec<&'static str> {
    match section {
        None => SECTIONS.iter().map(|(name, _)| *name).collect(),
        Some(name) => SECTIONS
            .iter()
            .find(|(s, _)| *s == name)
            .map(|(_, keys)| keys.to_vec())
            .unwrap_or_default(),
    }
}

/// The known key closest to `unknown`, if any is close enough.
///
/// Case and `-`/`_` differences count as exact matches, so `Log-Level`
/// suggests `log_level`.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let normalized = unknown.to_ascii_lowercase().replace('-', "_");
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(&normalized, key), *key))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Convert a figment error into diagnostics, attaching source spans from
/// `toml_sources` (`(path, contents)` pairs) where the key can be found.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            let section = path.first().map(String::as_str);
            let source = source_for(&error, toml_sources);

            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    // Prefer our own table; figment's list is the fallback.
                    let mut valid = keys_for(section);
                    if valid.is_empty() {
                        valid = expected.to_vec();
                    }
                    let (span, src) = locate(source, section, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section: section.map(str::to_string),
                        suggestion: suggest_key(field, &valid),
                        valid_keys: valid.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&path, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((key, parents)) => {
                            locate(source, parents.first().map(String::as_str), key)
                        }
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: actual.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn dotted(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

/// The `(path, contents)` pair the error's metadata points at, falling back
/// to the only source given (inline strings carry no file path).
fn source_for<'a>(
    error: &figment::Error,
    toml_sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    file.and_then(|path| toml_sources.iter().find(|(p, _)| *p == path))
        .or(match toml_sources {
            [only] => Some(only),
            _ => None,
        })
}

fn locate(
    source: Option<&(String, String)>,
    section: Option<&str>,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((path, content)) = source else {
        return (None, None);
    };
    match locate_key(content, section, key) {
        Some(range) => (
            Some(SourceSpan::from(range)),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte range of `key` as written in `content`.
///
/// With `section = Some(name)`, only lines under a `[name]` header are
/// searched; with `None`, a top-level key or a `[key]` header matches.
/// Comment lines are skipped.
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<Range<usize>> {
    let mut current: Option<&str> = None;
    let mut line_start = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = line.trim();
        let start = line_start;
        line_start += line.len();

        if body.is_empty() || body.starts_with('#') {
            continue;
        }

        if let Some(header) = body.strip_prefix('[').and_then(|h| h.split(']').next()) {
            let header = header.trim();
            if section.is_none() && header == key {
                let offset = line.find(key)?;
                return Some(start + offset..start + offset + key.len());
            }
            current = Some(header);
            continue;
        }

        let in_scope = match section {
            Some(name) => current == Some(name),
            None => current.is_none(),
        };
        let Some(rest) = body.strip_prefix(key) else {
            continue;
        };
        if in_scope && rest.trim_start().starts_with('=') {
            return Some(start + indent..start + indent + key.len());
        }
    }
    None
}

/// Print every diagnostic to stderr, followed by a one-line count.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    if !errors.is_empty() {
        eprintln!(
            "flowtab: {} configuration problem{} found",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# flowtab\n[app]\nname = \"flowtab\"\n\n[monetization]\n  monthly_copy_cp = 50\n# payout_rate_cents = 9\npayout_rate_cents = \"seven\"\n";

    fn text(range: Range<usize>) -> &'static str {
        &SAMPLE[range]
    }

    #[test]
    fn suggests_monetization_keys() {
        let keys = keys_for(Some("monetization"));
        assert_eq!(
            suggest_key("monthly_copy_cp", &keys).as_deref(),
            Some("monthly_copy_cap")
        );
        assert_eq!(
            suggest_key("payout_rate", &keys).as_deref(),
            Some("payout_rate_cents")
        );
    }

    #[test]
    fn suggestion_ignores_case_and_dashes() {
        assert_eq!(
            suggest_key("Log-Level", &keys_for(Some("app"))).as_deref(),
            Some("log_level")
        );
        assert_eq!(
            suggest_key("WAL-MODE", &keys_for(Some("storage"))).as_deref(),
            Some("wal_mode")
        );
    }

    #[test]
    fn suggests_section_names_at_top_level() {
        assert_eq!(
            suggest_key("monetisation", &keys_for(None)).as_deref(),
            Some("monetization")
        );
        assert_eq!(suggest_key("billing", &keys_for(None)), None);
        assert!(keys_for(Some("stripe")).is_empty());
    }

    #[test]
    fn locates_key_inside_its_section_only() {
        let range = locate_key(SAMPLE, Some("monetization"), "monthly_copy_cp").unwrap();
        assert_eq!(text(range), "monthly_copy_cp");
        assert!(locate_key(SAMPLE, Some("app"), "monthly_copy_cp").is_none());
        assert!(locate_key(SAMPLE, Some("vault"), "name").is_none());
    }

    #[test]
    fn locate_skips_comments() {
        let range = locate_key(SAMPLE, Some("monetization"), "payout_rate_cents").unwrap();
        assert!(SAMPLE[range.end..].starts_with(" = \"seven\""));
    }

    #[test]
    fn locates_section_header_at_top_level() {
        let range = locate_key(SAMPLE, None, "monetization").unwrap();
        assert_eq!(text(range.clone()), "monetization");
        assert_eq!(&SAMPLE[range.start - 1..range.start], "[");
    }

    #[test]
    fn locate_handles_crlf_line_endings() {
        let content = "[vault]\r\nencryption_kye = \"00\"\r\n";
        let range = locate_key(content, Some("vault"), "encryption_kye").unwrap();
        assert_eq!(&content[range], "encryption_kye");
    }
}
