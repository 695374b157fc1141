//! Link rewriting with the narrow casing rule: a fully upper-case match gets
//! an upper-case replacement; anything else gets the replacement as declared.

use regex::Regex;

use super::substitute::{rule_spans, substitute_each, Rule, Span, Substitution};
use crate::mapping::LinkMapping;

impl Rule for LinkMapping {
    fn regex(&self) -> &Regex {
        LinkMapping::regex(self)
    }

    fn render(&self, matched: &str) -> String {
        if matched == matched.to_uppercase() {
            self.replacement().to_uppercase()
        } else {
            self.replacement().to_string()
        }
    }
}

impl Substitution for LinkMapping {
    fn find_spans(&self, content: &str) -> Vec<Span> {
        rule_spans(self, content)
    }

    fn replace(&self, content: &str, span: &Span) -> String {
        self.render(&content[span.start..span.end])
    }
}

/// Applies link mappings in order, each to the previous one's output.
///
/// Mapping order only stops mattering when no replacement can be matched by a
/// later mapping's pattern; authors of mapping tables are expected to keep it
/// that way, it is not checked here.
pub fn rewrite_links(content: &str, mappings: &[LinkMapping]) -> String {
    substitute_each(content, mappings)
}
