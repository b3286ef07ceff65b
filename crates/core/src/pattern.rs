//! Table-driven pattern matching shared by every regex-based detector.
//!
//! A rule family is plain data: `{pattern, kind, severity, message}` rows.
//! One matching routine walks table -> lines -> matches -> violations, so
//! adding a rule never touches detector code.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::finding::{Severity, Violation, ViolationKind};

/// Placeholder in a message template replaced by the matched text.
pub const MATCH_PLACEHOLDER: &str = "{match}";
const MAX_EVIDENCE_CHARS: usize = 80;

/// A static rule row as written in a detector's table.
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: &'static str,
}

/// A user-supplied rule, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,
    pub pattern: String,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub regex: Regex,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

impl CompiledRule {
    pub fn from_custom(rule: &CustomRule) -> Result<Self, regex::Error> {
        Ok(Self {
            name: rule.name.clone(),
            regex: Regex::new(&rule.pattern)?,
            kind: rule.kind,
            severity: rule.severity,
            message: rule.message.clone(),
        })
    }
}

/// How many violations a rule may produce per scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// One violation per rule: its first accepted match.
    FirstMatch,
    /// One violation per accepted match on every line.
    EveryOccurrence,
}

/// A matched rule with its 1-based line number and matched text.
#[derive(Debug, Clone)]
pub struct RuleMatch<'a> {
    pub rule: &'a CompiledRule,
    pub line: usize,
    pub text: &'a str,
}

impl RuleMatch<'_> {
    pub fn to_violation(&self) -> Violation {
        let evidence = truncate(self.text, MAX_EVIDENCE_CHARS);
        let message = self.rule.message.replace(MATCH_PLACEHOLDER, &evidence);
        Violation::new(self.rule.kind, self.rule.severity, message)
            .at(format!("line {}", self.line))
            .with_evidence(evidence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile static rows. A row whose pattern fails to compile is logged and skipped.
    pub fn from_static(rows: &[PatternRule]) -> Self {
        let rules = rows
            .iter()
            .filter_map(|row| match Regex::new(row.pattern) {
                Ok(regex) => Some(CompiledRule {
                    name: row.name.to_string(),
                    regex,
                    kind: row.kind,
                    severity: row.severity,
                    message: row.message.to_string(),
                }),
                Err(e) => {
                    error!(rule = row.name, error = %e, "skipping invalid pattern rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn from_custom(rules: &[CustomRule]) -> Result<Self, (String, regex::Error)> {
        let rules = rules
            .iter()
            .map(|r| CompiledRule::from_custom(r).map_err(|e| (r.name.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn extend(&mut self, other: RuleTable) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule over `text` line by line. `accept` can veto individual
    /// matches (false-positive filtering).
    pub fn scan<'a>(
        &'a self,
        text: &'a str,
        mode: ScanMode,
        accept: impl Fn(&CompiledRule, &str) -> bool,
    ) -> Vec<RuleMatch<'a>> {
        let mut matches = Vec::new();
        for rule in &self.rules {
            'lines: for (idx, line) in text.lines().enumerate() {
                for m in rule.regex.find_iter(line) {
                    if !accept(rule, m.as_str()) {
                        continue;
                    }
                    matches.push(RuleMatch {
                        rule,
                        line: idx + 1,
                        text: m.as_str(),
                    });
                    if mode == ScanMode::FirstMatch {
                        break 'lines;
                    }
                }
            }
        }
        matches
    }

    /// Convenience: scan and convert every accepted match into a violation.
    pub fn violations(&self, text: &str, mode: ScanMode) -> Vec<Violation> {
        self.scan(text, mode, |_, _| true)
            .iter()
            .map(RuleMatch::to_violation)
            .collect()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &[PatternRule] = &[
        PatternRule {
            name: "word-foo",
            pattern: r"\bfoo\b",
            kind: ViolationKind::SuspiciousPattern,
            severity: Severity::Low,
            message: "found {match}",
        },
        PatternRule {
            name: "broken",
            pattern: r"(unclosed",
            kind: ViolationKind::SuspiciousPattern,
            severity: Severity::Low,
            message: "never compiled",
        },
    ];

    #[test]
    fn test_invalid_static_rule_is_skipped() {
        let table = RuleTable::from_static(ROWS);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_every_occurrence_reports_line_numbers() {
        let table = RuleTable::from_static(ROWS);
        let violations = table.violations("foo foo\nbar\nfoo", ScanMode::EveryOccurrence);
        let locations: Vec<_> = violations.iter().map(|v| v.location.clone().unwrap()).collect();
        assert_eq!(locations, vec!["line 1", "line 1", "line 3"]);
        assert_eq!(violations[0].message, "found foo");
    }

    #[test]
    fn test_first_match_stops_after_one() {
        let table = RuleTable::from_static(ROWS);
        assert_eq!(table.violations("foo\nfoo", ScanMode::FirstMatch).len(), 1);
    }

    #[test]
    fn test_accept_filter_skips_to_next_match() {
        let table = RuleTable::from_static(ROWS);
        let matches = table.scan("foo\nfoo", ScanMode::FirstMatch, |_, _| false);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_custom_rule_with_bad_regex_reports_name() {
        let rule = CustomRule {
            name: "bad".into(),
            pattern: "[".into(),
            kind: ViolationKind::SuspiciousPattern,
            severity: Severity::High,
            message: "x".into(),
        };
        let err = RuleTable::from_custom(&[rule]).unwrap_err();
        assert_eq!(err.0, "bad");
    }
}
