//! Command-line tool specifications.
//!
//! Tokens are read left to right as `--flag value` pairs. `--index` closes the
//! definition in progress and opens a new one; `--description` and `--topK`
//! attach to whatever definition is open. Unknown tokens and a trailing flag
//! without a value are skipped so one bad flag never takes the server down.

use std::fmt;
use std::num::NonZeroU32;

use thiserror::Error;
use tracing::{debug, warn};

/// Namespace prepended to every derived tool name.
pub const TOOL_NAME_PREFIX: &str = "get_information_";

const INDEX_FLAG: &str = "--index";
const DESCRIPTION_FLAG: &str = "--description";
const TOP_K_FLAG: &str = "--topK";

/// One knowledge index published as a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub index_name: String,
    pub description: String,
    /// Result-count override; `None` leaves the engine default in place.
    pub similarity_top_k: Option<NonZeroU32>,
    pub tool_name: String,
}

impl ToolDefinition {
    #[must_use]
    pub fn new(
        index_name: impl Into<String>,
        description: impl Into<String>,
        similarity_top_k: Option<NonZeroU32>,
    ) -> Self {
        let index_name = index_name.into();
        let tool_name = tool_name_for(&index_name);
        Self {
            index_name,
            description: description.into(),
            similarity_top_k,
            tool_name,
        }
    }
}

/// Derives `get_information_<slug>` from an index name.
///
/// The slug is the lower-cased name with every character outside `[a-z0-9]`
/// replaced by `_`, one underscore per character.
#[must_use]
pub fn tool_name_for(index_name: &str) -> String {
    let slug: String = index_name
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!("{TOOL_NAME_PREFIX}{slug}")
}

/// Fatal problems with the command line as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("no arguments given; usage: --index <name> --description <text> [--topK <n>]")]
    NoArguments,
    #[error("no complete tool definitions; each --index needs a non-empty --description")]
    NoDefinitions,
}

impl SpecError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoArguments => "NO_ARGUMENTS",
            Self::NoDefinitions => "NO_DEFINITIONS",
        }
    }
}

/// Recoverable problems found while parsing. Each one is logged as it is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecWarning {
    /// A block was closed without both an index name and a description.
    IncompleteDefinition {
        index_name: Option<String>,
        missing: &'static str,
    },
    /// A `--topK` value that is not a positive integer; the override is dropped.
    InvalidTopK {
        index_name: Option<String>,
        value: String,
    },
}

impl SpecWarning {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncompleteDefinition { .. } => "INCOMPLETE_DEFINITION",
            Self::InvalidTopK { .. } => "INVALID_TOP_K",
        }
    }
}

impl fmt::Display for SpecWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteDefinition {
                index_name,
                missing,
            } => write!(
                f,
                "discarding incomplete tool definition for index {}: missing {missing}",
                index_name.as_deref().unwrap_or("<none>")
            ),
            Self::InvalidTopK { index_name, value } => write!(
                f,
                "ignoring invalid --topK value {value:?} for index {}; using the engine default",
                index_name.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

/// Result of a successful parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSpecs {
    pub definitions: Vec<ToolDefinition>,
    pub warnings: Vec<SpecWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Index,
    Description,
    TopK,
}

impl Flag {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            INDEX_FLAG => Some(Self::Index),
            DESCRIPTION_FLAG => Some(Self::Description),
            TOP_K_FLAG => Some(Self::TopK),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Index => INDEX_FLAG,
            Self::Description => DESCRIPTION_FLAG,
            Self::TopK => TOP_K_FLAG,
        }
    }
}

#[derive(Debug, Default)]
struct PendingDefinition {
    index_name: Option<String>,
    description: Option<String>,
    similarity_top_k: Option<NonZeroU32>,
}

impl PendingDefinition {
    fn finalize(self) -> Result<ToolDefinition, SpecWarning> {
        let index_name = self.index_name.filter(|name| !name.is_empty());
        let description = self.description.filter(|text| !text.is_empty());
        match (index_name, description) {
            (Some(index_name), Some(description)) => Ok(ToolDefinition::new(
                index_name,
                description,
                self.similarity_top_k,
            )),
            (None, None) => Err(SpecWarning::IncompleteDefinition {
                index_name: None,
                missing: "--index and --description",
            }),
            (None, Some(_)) => Err(SpecWarning::IncompleteDefinition {
                index_name: None,
                missing: INDEX_FLAG,
            }),
            (Some(index_name), None) => Err(SpecWarning::IncompleteDefinition {
                index_name: Some(index_name),
                missing: DESCRIPTION_FLAG,
            }),
        }
    }
}

/// Parse state threaded through the token scan.
#[derive(Debug, Default)]
struct Accumulator {
    pending: Option<PendingDefinition>,
    parsed: ParsedSpecs,
}

impl Accumulator {
    fn apply(mut self, flag: Flag, value: &str) -> Self {
        match flag {
            Flag::Index => {
                self.close_pending();
                self.pending = Some(PendingDefinition {
                    index_name: Some(value.to_string()),
                    ..PendingDefinition::default()
                });
            }
            Flag::Description => {
                self.pending.get_or_insert_with(PendingDefinition::default).description =
                    Some(value.to_string());
            }
            Flag::TopK => {
                let pending = self.pending.get_or_insert_with(PendingDefinition::default);
                let Ok(top_k) = value.trim().parse::<NonZeroU32>() else {
                    let warning = SpecWarning::InvalidTopK {
                        index_name: pending.index_name.clone(),
                        value: value.to_string(),
                    };
                    warn!(code = warning.code(), "{warning}");
                    self.parsed.warnings.push(warning);
                    return self;
                };
                pending.similarity_top_k = Some(top_k);
            }
        }
        self
    }

    fn close_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match pending.finalize() {
            Ok(definition) => self.parsed.definitions.push(definition),
            Err(warning) => {
                warn!(code = warning.code(), "{warning}");
                self.parsed.warnings.push(warning);
            }
        }
    }

    fn finish(mut self) -> ParsedSpecs {
        self.close_pending();
        self.parsed
    }
}

/// Parses command-line tokens into tool definitions.
///
/// # Errors
/// Returns [`SpecError::NoArguments`] for an empty token list and
/// [`SpecError::NoDefinitions`] when no complete definition survives.
pub fn parse_tool_specs<I, S>(tokens: I) -> Result<ParsedSpecs, SpecError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tokens: Vec<S> = tokens.into_iter().collect();
    if tokens.is_empty() {
        return Err(SpecError::NoArguments);
    }

    let mut acc = Accumulator::default();
    let mut cursor = 0;
    while let Some(token) = tokens.get(cursor) {
        let token = token.as_ref();
        match (Flag::from_token(token), tokens.get(cursor + 1)) {
            (Some(flag), Some(value)) => {
                acc = acc.apply(flag, value.as_ref());
                cursor += 2;
            }
            (Some(flag), None) => {
                debug!(flag = flag.as_str(), "ignoring flag without a value");
                cursor += 1;
            }
            (None, _) => {
                debug!(token, "ignoring unrecognized argument");
                cursor += 1;
            }
        }
    }

    let parsed = acc.finish();
    if parsed.definitions.is_empty() {
        return Err(SpecError::NoDefinitions);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_k(value: u32) -> Option<NonZeroU32> {
        NonZeroU32::new(value)
    }

    #[test]
    fn parses_single_definition_with_top_k() {
        let parsed = parse_tool_specs([
            "--index",
            "Docs",
            "--description",
            "Company handbook",
            "--topK",
            "3",
        ])
        .expect("definition should parse");

        assert_eq!(
            parsed.definitions,
            vec![ToolDefinition {
                index_name: "Docs".to_string(),
                description: "Company handbook".to_string(),
                similarity_top_k: top_k(3),
                tool_name: "get_information_docs".to_string(),
            }]
        );
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn index_flag_separates_definitions() {
        let parsed = parse_tool_specs([
            "--index", "A", "--description", "first", "--index", "B", "--description",
            "second", "--topK", "7",
        ])
        .expect("definitions should parse");

        let names: Vec<_> = parsed
            .definitions
            .iter()
            .map(|definition| definition.index_name.as_str())
            .collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(parsed.definitions[0].similarity_top_k, None);
        assert_eq!(parsed.definitions[1].similarity_top_k, top_k(7));
    }

    #[test]
    fn incomplete_block_is_dropped_with_warning() {
        let parsed = parse_tool_specs([
            "--index",
            "NoDescription",
            "--index",
            "Docs",
            "--description",
            "handbook",
        ])
        .expect("one definition should survive");

        assert_eq!(parsed.definitions.len(), 1);
        assert_eq!(parsed.definitions[0].index_name, "Docs");
        assert_eq!(
            parsed.warnings,
            vec![SpecWarning::IncompleteDefinition {
                index_name: Some("NoDescription".to_string()),
                missing: "--description",
            }]
        );
    }

    #[test]
    fn orphan_description_yields_no_definitions() {
        let err = parse_tool_specs(["--description", "orphan"]).unwrap_err();
        assert_eq!(err, SpecError::NoDefinitions);
        assert_eq!(err.code(), "NO_DEFINITIONS");
    }

    #[test]
    fn orphan_description_does_not_leak_into_next_index() {
        let parsed = parse_tool_specs([
            "--description",
            "orphan",
            "--index",
            "Docs",
            "--description",
            "handbook",
        ])
        .expect("second block is complete");

        assert_eq!(parsed.definitions.len(), 1);
        assert_eq!(parsed.definitions[0].description, "handbook");
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn empty_token_list_is_fatal() {
        let tokens: [&str; 0] = [];
        assert_eq!(parse_tool_specs(tokens).unwrap_err(), SpecError::NoArguments);
    }

    #[test]
    fn invalid_top_k_keeps_definition_and_prior_value() {
        let parsed = parse_tool_specs([
            "--index",
            "Docs",
            "--description",
            "handbook",
            "--topK",
            "abc",
        ])
        .expect("definition should survive");
        assert_eq!(parsed.definitions[0].similarity_top_k, None);
        assert_eq!(parsed.warnings[0].code(), "INVALID_TOP_K");

        let parsed = parse_tool_specs([
            "--index",
            "Docs",
            "--topK",
            "5",
            "--description",
            "handbook",
            "--topK",
            "abc",
        ])
        .expect("definition should survive");
        assert_eq!(parsed.definitions[0].similarity_top_k, top_k(5));
    }

    #[test]
    fn zero_and_negative_top_k_are_rejected() {
        for value in ["0", "-3", "2.5"] {
            let parsed = parse_tool_specs([
                "--index",
                "Docs",
                "--description",
                "handbook",
                "--topK",
                value,
            ])
            .expect("definition should survive");
            assert_eq!(parsed.definitions[0].similarity_top_k, None, "value {value}");
            assert_eq!(parsed.warnings.len(), 1, "value {value}");
        }
    }

    #[test]
    fn unknown_tokens_and_dangling_flag_are_ignored() {
        let parsed = parse_tool_specs([
            "serve",
            "--index",
            "Docs",
            "--verbose",
            "--description",
            "handbook",
            "--topK",
        ])
        .expect("definition should parse");

        assert_eq!(parsed.definitions.len(), 1);
        assert_eq!(parsed.definitions[0].similarity_top_k, None);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn empty_values_make_block_incomplete() {
        let err = parse_tool_specs(["--index", "", "--description", "handbook"]).unwrap_err();
        assert_eq!(err, SpecError::NoDefinitions);

        let err = parse_tool_specs(["--index", "Docs", "--description", ""]).unwrap_err();
        assert_eq!(err, SpecError::NoDefinitions);
    }

    #[test]
    fn tool_name_slug_is_normalized() {
        assert_eq!(tool_name_for("My Index!"), "get_information_my_index_");
        assert_eq!(tool_name_for("Docs"), "get_information_docs");
        assert_eq!(tool_name_for("DOCS"), tool_name_for("docs"));
        assert_eq!(tool_name_for("q3-report.v2"), "get_information_q3_report_v2");
        assert_eq!(tool_name_for("café"), "get_information_caf_");
    }

    #[test]
    fn tool_names_only_contain_slug_characters() {
        for name in ["Docs", "My Index!", "a/b\\c", "Ünïcode 2024", "   "] {
            let tool_name = tool_name_for(name);
            let slug = tool_name
                .strip_prefix(TOOL_NAME_PREFIX)
                .expect("prefix present");
            assert!(
                slug.chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_'),
                "{tool_name}"
            );
        }
    }
}
