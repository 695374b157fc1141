//! Pattern substitution seam.
//!
//! Everything that rewrites markup goes through [`Substitution`]: find the
//! spans to replace, then render a replacement per span. The regex-backed
//! mappings implement it directly; [`SinglePass`] implements it over a whole
//! table at once. A structural (parser-backed) matcher would plug in here.

use regex::{Regex, RegexBuilder};

/// A byte range of the content selected for replacement. `rule` is the index
/// of the mapping that produced it (always 0 for a single mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub rule: usize,
}

pub trait Substitution {
    /// Non-overlapping spans in ascending order.
    fn find_spans(&self, content: &str) -> Vec<Span>;
    fn replace(&self, content: &str, span: &Span) -> String;
}

/// A single regex-backed mapping.
pub trait Rule {
    fn regex(&self) -> &Regex;
    fn render(&self, matched: &str) -> String;

    /// Where the replaced text begins for a match starting at `start`.
    /// Defaults to the match itself; rules may widen it to the left.
    fn span_start(&self, _content: &str, start: usize) -> usize {
        start
    }
}

pub(crate) fn rule_spans<R: Rule + ?Sized>(rule: &R, content: &str) -> Vec<Span> {
    let mut floor = 0;
    rule.regex()
        .find_iter(content)
        .map(|m| {
            let start = rule.span_start(content, m.start()).max(floor);
            floor = m.end();
            Span {
                start,
                end: m.end(),
                rule: 0,
            }
        })
        .collect()
}

/// Applies one substitution to `content`. Text outside spans is copied as is.
pub fn substitute<S: Substitution + ?Sized>(content: &str, sub: &S) -> String {
    let spans = sub.find_spans(content);
    if spans.is_empty() {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for span in &spans {
        out.push_str(&content[last..span.start]);
        out.push_str(&sub.replace(content, span));
        last = span.end;
    }
    out.push_str(&content[last..]);
    out
}

/// Applies each rule in order; rule N+1 sees the output of rule N.
pub fn substitute_each<S: Substitution>(content: &str, rules: &[S]) -> String {
    rules
        .iter()
        .fold(content.to_string(), |acc, rule| substitute(&acc, rule))
}

/// All rules of a table combined into one alternation and applied
/// simultaneously. The leftmost match wins; at the same position the earlier
/// rule wins. Replacement output is never rematched.
#[derive(Debug)]
pub struct SinglePass<'a, R> {
    rules: &'a [R],
    combined: Option<Regex>,
    /// Capture group index of each rule in `combined`.
    groups: Vec<usize>,
}

impl<'a, R: Rule> SinglePass<'a, R> {
    pub fn new(rules: &'a [R]) -> Result<Self, regex::Error> {
        if rules.is_empty() {
            return Ok(Self {
                rules,
                combined: None,
                groups: Vec::new(),
            });
        }
        let alternation = rules
            .iter()
            .enumerate()
            .map(|(i, r)| format!("(?P<{}>(?:{}))", group_name(i), r.regex().as_str()))
            .collect::<Vec<_>>()
            .join("|");
        let combined = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()?;
        let groups = (0..rules.len())
            .map(|i| {
                let name = group_name(i);
                combined
                    .capture_names()
                    .position(|n| n == Some(name.as_str()))
                    .unwrap_or(0)
            })
            .collect();
        Ok(Self {
            rules,
            combined: Some(combined),
            groups,
        })
    }
}

fn group_name(i: usize) -> String {
    format!("relocale_rule_{i}")
}

impl<R: Rule> Substitution for SinglePass<'_, R> {
    fn find_spans(&self, content: &str) -> Vec<Span> {
        let Some(combined) = &self.combined else {
            return Vec::new();
        };
        let mut floor = 0;
        combined
            .captures_iter(content)
            .filter_map(|caps| {
                self.groups.iter().enumerate().find_map(|(rule, &g)| {
                    caps.get(g).map(|m| (rule, m))
                })
            })
            .map(|(rule, m)| {
                let start = self.rules[rule].span_start(content, m.start()).max(floor);
                floor = m.end();
                Span {
                    start,
                    end: m.end(),
                    rule,
                }
            })
            .collect()
    }

    fn replace(&self, content: &str, span: &Span) -> String {
        self.rules[span.rule].render(&content[span.start..span.end])
    }
}
