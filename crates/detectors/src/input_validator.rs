use std::collections::{BTreeSet, HashSet};

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use riskguard::detector::{Context, Detector, DetectorError};
use riskguard::finding::*;
use riskguard::input::{measure_depth, Input, Node, NodeId};

pub const MAX_STRING_LENGTH: usize = 10_000;
pub const MAX_ARRAY_LENGTH: usize = 1_000;
pub const MAX_OBJECT_DEPTH: usize = 20;
pub const RATE_LIMIT: f64 = 100.0;
/// Nested values below this depth are not inspected.
const MAX_VALIDATION_DEPTH: usize = 5;
/// Only this many array elements are validated recursively.
const ARRAY_SAMPLE: usize = 100;
const HETEROGENEOUS_MIN_LEN: usize = 10;
const BASE64_MIN_SUSPICIOUS_LEN: usize = 100;
const PROTOTYPE_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];
const EXECUTABLE_MARKERS: [&str; 3] = ["<script", "eval(", "exec("];

const SCORES: SeverityScores = SeverityScores {
    low: 10,
    medium: 25,
    high: 45,
    critical: 70,
};

static SUSPICIOUS_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(exe|bat|cmd|scr|pif|vbs|vbe|ps1|sh|jar|msi|dll|hta)\b")
        .expect("extension pattern is valid")
});
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email shape pattern is valid"));
static STRICT_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern is valid")
});
static BASE64_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").expect("base64 pattern is valid"));

/// Validates shape and size of strings, arrays and object graphs, and
/// checks the caller-reported request rate.
pub struct InputValidator;

struct Walk<'a> {
    input: &'a Input,
    visited: HashSet<NodeId>,
    violations: Vec<Violation>,
}

impl Walk<'_> {
    fn validate(&mut self, id: NodeId, path: &str, depth: usize) {
        if !self.visited.insert(id) {
            return;
        }
        match self.input.node(id) {
            Node::String(s) => self.validate_string(s, path),
            Node::Array(items) => self.validate_array(items, path, depth),
            Node::Object(fields) => self.validate_object(fields, path, depth),
            _ => {}
        }
    }

    fn validate_string(&mut self, s: &str, path: &str) {
        let length = s.chars().count();
        if length > MAX_STRING_LENGTH {
            self.violations.push(
                Violation::new(
                    ViolationKind::InvalidFormat,
                    Severity::High,
                    format!("String length {length} exceeds maximum of {MAX_STRING_LENGTH}"),
                )
                .at(path)
                .with_evidence(length),
            );
        }

        if s.contains('\0') {
            self.violations.push(
                Violation::new(
                    ViolationKind::SuspiciousPattern,
                    Severity::High,
                    "String contains a null byte",
                )
                .at(path),
            );
        }

        if let Some(m) = SUSPICIOUS_EXTENSION.find(s) {
            self.violations.push(
                Violation::new(
                    ViolationKind::SuspiciousPattern,
                    Severity::Medium,
                    format!("Suspicious file extension '{}'", m.as_str()),
                )
                .at(path)
                .with_evidence(m.as_str()),
            );
        }

        if EMAIL_SHAPE.is_match(s) && !STRICT_EMAIL.is_match(s) {
            self.violations.push(
                Violation::new(
                    ViolationKind::InvalidFormat,
                    Severity::Low,
                    "Malformed email address",
                )
                .at(path)
                .with_evidence(s),
            );
        }

        let hit = BASE64_SEGMENT
            .find_iter(s)
            .map(|m| m.as_str())
            .find(|segment| segment.len() > BASE64_MIN_SUSPICIOUS_LEN && decodes_to_executable(segment));
        if let Some(segment) = hit {
            self.violations.push(
                Violation::new(
                    ViolationKind::SuspiciousPattern,
                    Severity::High,
                    "Base64 segment decodes to executable content",
                )
                .at(path)
                .with_evidence(segment.chars().take(40).collect::<String>()),
            );
        }
    }

    fn validate_array(&mut self, items: &[NodeId], path: &str, depth: usize) {
        if items.len() > MAX_ARRAY_LENGTH {
            self.violations.push(
                Violation::new(
                    ViolationKind::InvalidFormat,
                    Severity::Medium,
                    format!(
                        "Array length {} exceeds maximum of {MAX_ARRAY_LENGTH}",
                        items.len()
                    ),
                )
                .at(path)
                .with_evidence(items.len()),
            );
        }

        let types: BTreeSet<&str> = items
            .iter()
            .map(|id| self.input.node(*id).type_name())
            .collect();
        if types.len() > 1 && items.len() > HETEROGENEOUS_MIN_LEN {
            self.violations.push(
                Violation::new(
                    ViolationKind::SuspiciousPattern,
                    Severity::Low,
                    format!("Array mixes {} element types", types.len()),
                )
                .at(path)
                .with_evidence(types.into_iter().collect::<Vec<_>>()),
            );
        }

        if depth >= MAX_VALIDATION_DEPTH {
            return;
        }
        for (i, id) in items.iter().take(ARRAY_SAMPLE).enumerate() {
            self.validate(*id, &format!("{path}[{i}]"), depth + 1);
        }
    }

    fn validate_object(&mut self, fields: &[(String, NodeId)], path: &str, depth: usize) {
        for (key, _) in fields {
            if PROTOTYPE_KEYS.contains(&key.as_str()) {
                self.violations.push(
                    Violation::new(
                        ViolationKind::SuspiciousPattern,
                        Severity::Critical,
                        format!("Prototype pollution attempt via key '{key}'"),
                    )
                    .at(path)
                    .with_evidence(key.as_str()),
                );
            }
        }

        if depth >= MAX_VALIDATION_DEPTH {
            return;
        }
        for (key, id) in fields {
            self.validate(*id, &format!("{path}.{key}"), depth + 1);
        }
    }
}

fn decodes_to_executable(segment: &str) -> bool {
    let trimmed = segment.trim_end_matches('=');
    let usable = trimmed.len() - trimmed.len() % 4;
    STANDARD_NO_PAD
        .decode(&trimmed[..usable])
        .map(|bytes| {
            let text = String::from_utf8_lossy(&bytes).to_lowercase();
            EXECUTABLE_MARKERS.iter().any(|m| text.contains(m))
        })
        .unwrap_or(false)
}

impl Detector for InputValidator {
    fn name(&self) -> &str {
        "input-validator"
    }

    fn description(&self) -> &str {
        "Checks size limits, nesting depth, prototype pollution, malformed formats and request rate"
    }

    fn check_type(&self) -> CheckType {
        CheckType::InputValidation
    }

    fn detect(&self, input: &Input, context: Option<&Context>) -> Result<CheckResult, DetectorError> {
        let mut walk = Walk {
            input,
            visited: HashSet::new(),
            violations: Vec::new(),
        };

        if input.root_node().is_container() {
            let depth = measure_depth(input, MAX_OBJECT_DEPTH);
            if depth.cyclic {
                walk.violations.push(
                    Violation::new(
                        ViolationKind::InvalidFormat,
                        Severity::High,
                        format!(
                            "Object graph is circular; nesting depth is unbounded (maximum {MAX_OBJECT_DEPTH})"
                        ),
                    )
                    .at("$"),
                );
            } else if depth.exceeds(MAX_OBJECT_DEPTH) {
                walk.violations.push(
                    Violation::new(
                        ViolationKind::InvalidFormat,
                        Severity::High,
                        format!("Object nesting exceeds maximum depth of {MAX_OBJECT_DEPTH}"),
                    )
                    .at("$"),
                );
            }
        }

        walk.validate(input.root(), "$", 0);

        if let Some(count) = context.and_then(Context::request_count) {
            if count > RATE_LIMIT {
                walk.violations.push(
                    Violation::new(
                        ViolationKind::RateLimitExceeded,
                        Severity::Medium,
                        format!("Request count {count} exceeds limit of {RATE_LIMIT}"),
                    )
                    .with_evidence(count),
                );
            }
        }

        let violations = walk.violations;
        let score = SCORES.score(&violations);
        let passed = !violations.iter().any(|v| v.severity >= Severity::High);
        Ok(
            CheckResult::new(CheckType::InputValidation, passed, score, violations)
                .with_metadata("input_type", input.root_node().type_name()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskguard::input::InputBuilder;
    use serde_json::json;

    fn check(input: Input) -> CheckResult {
        InputValidator.detect(&input, None).unwrap()
    }

    fn kinds(result: &CheckResult) -> Vec<ViolationKind> {
        result.violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_every_pattern_compiles() {
        assert!(SUSPICIOUS_EXTENSION.is_match("setup.EXE"));
        assert!(EMAIL_SHAPE.is_match("a@b"));
        assert!(STRICT_EMAIL.is_match("alice@corp.io"));
        assert!(BASE64_SEGMENT.is_match("QUJDREVGR0hJSktMTU5PUFFS"));
    }

    #[test]
    fn test_plain_string_passes() {
        let result = check(Input::from("hello world"));
        assert!(result.passed);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_oversized_string() {
        let result = check(Input::from("a".repeat(MAX_STRING_LENGTH + 1)));
        assert_eq!(kinds(&result), vec![ViolationKind::InvalidFormat]);
        assert!(!result.passed);
        assert_eq!(result.score, 45);
    }

    #[test]
    fn test_null_byte_and_extension() {
        let result = check(Input::from("payload.exe\0"));
        assert_eq!(
            kinds(&result),
            vec![ViolationKind::SuspiciousPattern, ViolationKind::SuspiciousPattern]
        );
        assert_eq!(result.score, 45 + 25);
    }

    #[test]
    fn test_email_shape_checks() {
        assert!(check(Input::from("user@example.com")).violations.is_empty());
        let bad = check(Input::from("user@localhost"));
        assert_eq!(kinds(&bad), vec![ViolationKind::InvalidFormat]);
        assert_eq!(bad.violations[0].severity, Severity::Low);
        // prose mentioning an address is not an email field
        assert!(check(Input::from("mail me at user@host")).violations.is_empty());
    }

    #[test]
    fn test_base64_with_executable_payload() {
        let payload = "<script>alert('owned')</script>".repeat(4);
        let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
        assert!(encoded.len() > 100);
        let result = check(Input::from(format!("data {encoded}")));
        assert!(result
            .violations
            .iter()
            .any(|v| v.message.contains("Base64")));

        let benign = base64::engine::general_purpose::STANDARD.encode("x".repeat(120));
        assert!(check(Input::from(benign)).violations.is_empty());
    }

    #[test]
    fn test_array_limits() {
        let long: Vec<u32> = (0..1001).collect();
        let result = check(Input::from(json!(long)));
        assert!(result.violations.iter().any(|v| v.kind == ViolationKind::InvalidFormat));

        let mixed = json!([1, "a", 2, "b", 3, "c", 4, "d", 5, "e", 6]);
        let result = check(Input::from(mixed));
        assert_eq!(kinds(&result), vec![ViolationKind::SuspiciousPattern]);
    }

    #[test]
    fn test_only_first_hundred_elements_are_inspected() {
        let mut items = vec![json!("ok"); 100];
        items.push(json!("bad\u{0}"));
        assert!(check(Input::from(json!(items))).violations.is_empty());
    }

    #[test]
    fn test_prototype_pollution_keys() {
        let result = check(Input::from(json!({"__proto__": {"admin": true}})));
        assert_eq!(result.violations[0].severity, Severity::Critical);
        assert!(!result.passed);
    }

    #[test]
    fn test_depth_limit() {
        let mut value = json!(1);
        for _ in 0..25 {
            value = json!({ "n": value });
        }
        let result = check(Input::from(value));
        assert!(result.violations.iter().any(|v| v.message.contains("maximum depth")));

        assert!(check(Input::from(json!({"a": {"b": 1}}))).violations.is_empty());
    }

    #[test]
    fn test_self_reference_flags_depth_and_terminates() {
        let mut b = InputBuilder::new();
        let obj = b.object();
        b.insert(obj, "self", obj).unwrap();
        let result = check(b.build(obj));
        assert_eq!(kinds(&result), vec![ViolationKind::InvalidFormat]);
        assert!(result.violations[0].message.contains("circular"));
    }

    #[test]
    fn test_nested_strings_are_validated() {
        let result = check(Input::from(json!({"user": {"file": "run.bat"}})));
        assert_eq!(result.violations[0].location.as_deref(), Some("$.user.file"));
    }

    #[test]
    fn test_rate_limit_from_context() {
        let ctx = Context::new().with_data("requestCount", 101);
        let result = InputValidator.detect(&Input::from("x"), Some(&ctx)).unwrap();
        assert_eq!(kinds(&result), vec![ViolationKind::RateLimitExceeded]);

        let ctx = Context::new().with_data("requestCount", 100);
        assert!(InputValidator.detect(&Input::from("x"), Some(&ctx)).unwrap().violations.is_empty());
    }
}
