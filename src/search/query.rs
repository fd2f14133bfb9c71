use regex::Regex;
use crate::core::error::{Error, ErrorKind, Result};

/// Query text with its language resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub text: String,
    pub language: String,
}

/// Splits an optional trailing ` -xx` language marker off a query,
/// e.g. `"la tour eiffel -fr"`.
pub struct QueryParser {
    suffix: Regex,
    default_language: String,
}

impl QueryParser {
    pub fn new(default_language: &str) -> Result<Self> {
        let suffix = Regex::new(r"^(?s)(.*)\s-([A-Za-z]{2})\s*$")
            .map_err(|e| Error::new(ErrorKind::InvalidArgument, e.to_string()))?;
        Ok(QueryParser {
            suffix,
            default_language: default_language.to_string(),
        })
    }

    pub fn parse(&self, raw: &str) -> ParsedQuery {
        match self.suffix.captures(raw) {
            Some(caps) => ParsedQuery {
                text: caps[1].trim().to_string(),
                language: caps[2].to_lowercase(),
            },
            None => ParsedQuery {
                text: raw.trim().to_string(),
                language: self.default_language.clone(),
            },
        }
    }
}
