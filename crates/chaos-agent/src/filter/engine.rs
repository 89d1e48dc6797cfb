use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use thiserror::Error;

use crate::docker::snapshot::ContainerSnapshot;

/// Prefix that turns a single selector into a regular expression.
pub const REGEX_PREFIX: &str = "re2:";

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),
}

#[derive(Debug)]
enum Selector {
    All,
    Names(Vec<String>),
    Pattern(RegexMatcher),
}

/// Chooses which listed containers a chaos action applies to.
///
/// - no selectors: every container
/// - `["re2:^api-"]`: names matching the regex
/// - `["web", "db"]`: exactly these names
///
/// Containers labelled for skipping are never selected.
#[derive(Debug)]
pub struct ContainerFilter {
    selector: Selector,
}

impl ContainerFilter {
    pub fn new(selectors: &[String]) -> Result<Self, FilterError> {
        let selector = match selectors {
            [] => Selector::All,
            [single] if single.starts_with(REGEX_PREFIX) => {
                let pattern = &single[REGEX_PREFIX.len()..];
                let matcher = RegexMatcherBuilder::new()
                    .multi_line(false)
                    .build(pattern)
                    .map_err(|e| FilterError::InvalidRegex(e.to_string()))?;
                Selector::Pattern(matcher)
            }
            names => Selector::Names(
                names
                    .iter()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .collect(),
            ),
        };
        Ok(Self { selector })
    }

    pub fn all() -> Self {
        Self { selector: Selector::All }
    }

    pub fn matches(&self, container: &ContainerSnapshot) -> bool {
        if container.is_skipped() {
            return false;
        }
        match &self.selector {
            Selector::All => true,
            Selector::Names(names) => names.iter().any(|n| *n == container.name),
            Selector::Pattern(matcher) => matcher
                .is_match(container.name.as_bytes())
                .unwrap_or(false),
        }
    }
}
