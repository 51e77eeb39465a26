// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic rendering for configuration load failures.
//!
//! Figment reports deserialization problems as flat error values; this
//! module turns them into miette diagnostics that point at the offending
//! key in the TOML source and suggest the closest valid key name via
//! Jaro-Winkler similarity.

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// 0.75 catches common typos like `retension` -> `retention` while
/// filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(mnemo::config::unknown_key), help("{hint}"))]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Suggested correction via fuzzy matching, if any.
        suggestion: Option<String>,
        /// Rendered help text listing the suggestion and valid keys.
        hint: String,
        /// Source span for the offending key.
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        /// The source file content for context display.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid value for `{key}`: found {found}, expected {expected}")]
    #[diagnostic(code(mnemo::config::invalid_type))]
    InvalidType {
        /// Dotted path of the key with the wrong type.
        key: String,
        /// What the parser actually saw.
        found: String,
        /// What type was expected.
        expected: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(mnemo::config::missing_key),
        help("add `{key} = <value>` under the matching section of mnemo.toml")
    )]
    MissingKey {
        /// The missing key name.
        key: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(mnemo::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(mnemo::config::other))]
    Other(String),
}

impl ConfigError {
    /// Build an unknown-key diagnostic with a fuzzy suggestion and, when the
    /// key can be located in a loaded source, a span pointing at it.
    fn unknown_key(
        field: &str,
        valid_keys: &[&str],
        location: Option<(SourceSpan, NamedSource<String>)>,
    ) -> Self {
        let suggestion = suggest_key(field, valid_keys);
        let listing = valid_keys.join(", ");
        let hint = match suggestion.as_deref() {
            Some(best) => format!("did you mean `{best}`? Valid keys: {listing}"),
            None => format!("valid keys: {listing}"),
        };
        let (span, src) = location.map_or((None, None), |(s, n)| (Some(s), Some(n)));

        ConfigError::UnknownKey {
            key: field.to_string(),
            suggestion,
            hint,
            span,
            src,
        }
    }
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A single figment error may aggregate several underlying failures; each
/// one becomes its own diagnostic. `toml_sources` holds the `(path,
/// content)` pairs of every TOML layer that was loaded, for span lookup.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let locator = SpanLocator::new(toml_sources);

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, valid_keys) => {
                let location = locator.locate(&error, field);
                ConfigError::unknown_key(field, valid_keys, location)
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
            },
            Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Resolves a figment error to a span inside one of the loaded TOML layers.
struct SpanLocator<'a> {
    sources: &'a [(String, String)],
}

impl<'a> SpanLocator<'a> {
    fn new(sources: &'a [(String, String)]) -> Self {
        Self { sources }
    }

    fn locate(
        &self,
        error: &figment::error::Error,
        field: &str,
    ) -> Option<(SourceSpan, NamedSource<String>)> {
        let file = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });

        let source = match file {
            Some(path) => self.sources.iter().find(|(name, _)| *name == path)?,
            // String-loaded configs carry no file metadata; with a single
            // source there is nothing to disambiguate.
            None if self.sources.len() == 1 => &self.sources[0],
            None => return None,
        };
        let (name, content) = source;

        // error.path holds the enclosing table, e.g. ["embedding", "primary"]
        // for a typo inside [embedding.primary].
        let section = (!error.path.is_empty()).then(|| error.path.join("."));
        let span = key_span(content, section.as_deref(), field)?;

        Some((span, NamedSource::new(name, content.clone())))
    }
}

/// Locate `field` as a key assignment in `content`, searching after the
/// `[section]` header when one is given, and return its span.
fn key_span(content: &str, section: Option<&str>, field: &str) -> Option<SourceSpan> {
    let body_start = match section {
        Some(name) => {
            let header = format!("[{name}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut cursor = body_start;
    for line in content[body_start..].split_inclusive('\n') {
        let stripped = line.trim_start();
        let is_assignment = stripped
            .strip_prefix(field)
            .is_some_and(|rest| rest.trim_start().starts_with('='));
        if is_assignment {
            let indent = line.len() - stripped.len();
            return Some(SourceSpan::new((cursor + indent).into(), field.len()));
        }
        cursor += line.len();
    }

    None
}

/// Suggest the closest valid key by Jaro-Winkler similarity, or `None`
/// when nothing scores above the threshold.
fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_retension_for_retention_days() {
        let valid = &["retention_days", "sweep_interval_secs"];
        assert_eq!(
            suggest_key("retension_days", valid),
            Some("retention_days".to_string())
        );
    }

    #[test]
    fn suggest_ttl_sec_for_ttl_secs() {
        let valid = &["enabled", "ttl_secs"];
        assert_eq!(suggest_key("ttl_sec", valid), Some("ttl_secs".to_string()));
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["enabled", "ttl_secs"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_span_inside_section() {
        let content = "[cache]\nttl_sec = 60\n";
        let span = key_span(content, Some("cache"), "ttl_sec").unwrap();
        assert_eq!(
            &content[span.offset()..span.offset() + span.len()],
            "ttl_sec"
        );
    }

    #[test]
    fn key_span_at_top_level() {
        let content = "unknown = true\n[cache]\n";
        let span = key_span(content, None, "unknown").unwrap();
        assert_eq!(span.offset(), 0);
        assert_eq!(span.len(), "unknown".len());
    }

    #[test]
    fn key_span_in_dotted_section() {
        let content = "[embedding]\ndimensions = 384\n\n[embedding.primary]\nendpoit = \"x\"\n";
        let span = key_span(content, Some("embedding.primary"), "endpoit").unwrap();
        assert_eq!(
            &content[span.offset()..span.offset() + span.len()],
            "endpoit"
        );
    }

    #[test]
    fn key_span_misses_when_key_absent() {
        let content = "[cache]\nttl_secs = 300\n";
        assert!(key_span(content, Some("cache"), "enabled").is_none());
    }

    #[test]
    fn inline_source_still_gets_a_span() {
        let content = "[retention]\nretension_days = 30\n";
        let err = crate::loader::load_config_from_str(content).unwrap_err();
        let sources = vec![("<inline>".to_string(), content.to_string())];
        let errors = figment_to_config_errors(err, &sources);
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, span: Some(_), .. } if key == "retension_days"
        )));
    }
}

