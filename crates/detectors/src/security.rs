use once_cell::sync::Lazy;
use riskguard::detector::{Context, Detector, DetectorError};
use riskguard::finding::*;
use riskguard::input::{extract_text, Input};
use riskguard::pattern::{CompiledRule, PatternRule, RuleTable, ScanMode};

const SCORES: SeverityScores = SeverityScores {
    low: 15,
    medium: 30,
    high: 50,
    critical: 80,
};

/// Fixture domains whose addresses are never reported.
const IGNORED_EMAIL_DOMAINS: [&str; 2] = ["example.com", "test.com"];
const EMAIL_RULE: &str = "email-address";

const fn rule(
    name: &'static str,
    pattern: &'static str,
    kind: ViolationKind,
    severity: Severity,
    message: &'static str,
) -> PatternRule {
    PatternRule {
        name,
        pattern,
        kind,
        severity,
        message,
    }
}

const SQL_INJECTION: &[PatternRule] = &[
    rule(
        "sql-keyword-clause",
        r"(?i)\b(select|insert|update|delete|drop|union|alter|truncate)\b.{0,100}?\b(from|into|where|table|set|values|select|database)\b",
        ViolationKind::SqlInjection,
        Severity::Critical,
        "SQL statement fragment: {match}",
    ),
    rule(
        "sql-tautology",
        r"(?i)'\s*or\s*'[^']*'\s*=\s*'[^']*",
        ViolationKind::SqlInjection,
        Severity::Critical,
        "SQL tautology: {match}",
    ),
    rule(
        "sql-numeric-tautology",
        r"(?i)\bor\s+(\d+)\s*=\s*(\d+)\b",
        ViolationKind::SqlInjection,
        Severity::Critical,
        "SQL tautology: {match}",
    ),
    rule(
        "sql-comment",
        r"('\s*--|;\s*--|/\*.*?\*/)",
        ViolationKind::SqlInjection,
        Severity::Critical,
        "Inline SQL comment: {match}",
    ),
];

const XSS: &[PatternRule] = &[
    rule(
        "script-tag",
        r"(?i)<\s*script\b",
        ViolationKind::Xss,
        Severity::High,
        "Script tag: {match}",
    ),
    rule(
        "javascript-scheme",
        r"(?i)javascript\s*:",
        ViolationKind::Xss,
        Severity::High,
        "javascript: URL scheme",
    ),
    rule(
        "event-handler",
        r"(?i)\bon(load|error|click|mouseover|mouseout|focus|blur|submit|change|keydown|keyup|input)\s*=",
        ViolationKind::Xss,
        Severity::High,
        "Inline event handler: {match}",
    ),
    rule(
        "embedding-tag",
        r"(?i)<\s*(iframe|object|embed)\b",
        ViolationKind::Xss,
        Severity::High,
        "Embedding tag: {match}",
    ),
    rule(
        "dom-sink",
        r"(?i)(document\.write\s*\(|document\.cookie|\.innerHTML\s*=|\beval\s*\()",
        ViolationKind::Xss,
        Severity::High,
        "DOM sink: {match}",
    ),
];

const PATH_TRAVERSAL: &[PatternRule] = &[
    rule(
        "dot-dot-slash",
        r"(?i)(\.\./|\.\.\\|\.\.%2f|\.\.%5c|%2e%2e%2f|%2e%2e/)",
        ViolationKind::PathTraversal,
        Severity::High,
        "Path traversal sequence: {match}",
    ),
    rule(
        "sensitive-path",
        r"(?i)(/etc/(passwd|shadow|hosts|sudoers)|/proc/self/environ|c:\\windows\\system32|\\windows\\win\.ini)",
        ViolationKind::PathTraversal,
        Severity::High,
        "Sensitive file path: {match}",
    ),
];

const COMMAND_INJECTION: &[PatternRule] = &[
    rule(
        "shell-metacharacter",
        r"[|;`&<>]|\$\(|\$\{",
        ViolationKind::CommandInjection,
        Severity::Critical,
        "Shell metacharacter: {match}",
    ),
    rule(
        "shell-command",
        r"(?i)\b(cat|ls|rm|wget|curl|nc|netcat|chmod|chown|ping|kill|whoami)\s+[-/~.$]",
        ViolationKind::CommandInjection,
        Severity::Critical,
        "Shell command: {match}",
    ),
    rule(
        "shell-invocation",
        r"(?i)\b(sh|bash|zsh|cmd(\.exe)?|powershell(\.exe)?)\s+(-c|/c|-command|-e)\b",
        ViolationKind::CommandInjection,
        Severity::Critical,
        "Shell invocation: {match}",
    ),
];

const SENSITIVE_DATA: &[PatternRule] = &[
    rule(
        "credit-card",
        r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,4}\b",
        ViolationKind::UnauthorizedAccess,
        Severity::High,
        "Possible credit card number",
    ),
    rule(
        EMAIL_RULE,
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        ViolationKind::UnauthorizedAccess,
        Severity::High,
        "Email address exposed: {match}",
    ),
    rule(
        "secret-assignment",
        r#"(?i)(password|passwd|secret|token|api[_-]?key|access[_-]?key)["']?\s*[:=]\s*["']?[^\s"',}]+"#,
        ViolationKind::UnauthorizedAccess,
        Severity::High,
        "Secret value exposed",
    ),
    rule(
        "private-key",
        r"-----BEGIN (RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
        ViolationKind::UnauthorizedAccess,
        Severity::High,
        "Private key material",
    ),
];

static RULES: Lazy<RuleTable> = Lazy::new(|| {
    let mut table = RuleTable::new();
    for family in [
        SQL_INJECTION,
        XSS,
        PATH_TRAVERSAL,
        COMMAND_INJECTION,
        SENSITIVE_DATA,
    ] {
        table.extend(RuleTable::from_static(family));
    }
    table
});

fn accept(rule: &CompiledRule, matched: &str) -> bool {
    if rule.name != EMAIL_RULE {
        return true;
    }
    let lower = matched.to_lowercase();
    !IGNORED_EMAIL_DOMAINS.iter().any(|d| lower.contains(d))
}

/// Matches injection, traversal and data-exposure rule families against
/// the text form of the input. One violation per matching rule.
pub struct SecurityDetector;

impl Detector for SecurityDetector {
    fn name(&self) -> &str {
        "security-detector"
    }

    fn description(&self) -> &str {
        "Detects SQL injection, XSS, path traversal, command injection and sensitive data exposure"
    }

    fn check_type(&self) -> CheckType {
        CheckType::Security
    }

    fn detect(&self, input: &Input, _context: Option<&Context>) -> Result<CheckResult, DetectorError> {
        let text = extract_text(input);
        let violations: Vec<Violation> = RULES
            .scan(&text, ScanMode::FirstMatch, accept)
            .iter()
            .map(|m| m.to_violation())
            .collect();
        let score = SCORES.score(&violations);
        Ok(CheckResult::new(
            CheckType::Security,
            violations.is_empty(),
            score,
            violations,
        )
        .with_metadata("rules_evaluated", RULES.len()))
    }
}
