use serde::Deserialize;

/// How the parser treats input it cannot make sense of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Header lines without `": "` are skipped and an unparsable
    /// `content-length` counts as zero. The request still completes.
    #[default]
    Lenient,
    /// Both of the above are reported as [`ParseError`](crate::error::ParseError).
    Strict,
}

impl ParsePolicy {
    /// Parses `lenient` or `strict`, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("lenient") {
            Some(ParsePolicy::Lenient)
        } else if name.eq_ignore_ascii_case("strict") {
            Some(ParsePolicy::Strict)
        } else {
            None
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, ParsePolicy::Strict)
    }
}

/// Knobs shared by [`HeaderParser`](super::header::HeaderParser) and
/// [`RequestParser`](super::parser::RequestParser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
    pub policy: ParsePolicy,
    /// Upper bound on the header block. `None` means unbounded.
    pub max_header_size: Option<usize>,
}

impl ParserOptions {
    pub fn strict() -> Self {
        Self {
            policy: ParsePolicy::Strict,
            max_header_size: None,
        }
    }

    pub fn with_max_header_size(mut self, limit: usize) -> Self {
        self.max_header_size = Some(limit);
        self
    }
}
