use once_cell::sync::Lazy;
use riskguard::detector::{Context, Detector, DetectorError};
use riskguard::finding::*;
use riskguard::input::{extract_text, Input};
use riskguard::pattern::{PatternRule, RuleTable, ScanMode};

const SCORES: SeverityScores = SeverityScores {
    low: 10,
    medium: 25,
    high: 40,
    critical: 60,
};

/// Source paths that legitimately contain test doubles.
const TEST_PATH_MARKERS: [&str; 7] = [
    ".test.",
    ".spec.",
    "_test.",
    "/tests/",
    "/test/",
    "__tests__",
    "__mocks__",
];

macro_rules! rules {
    ($kind:expr; $( $name:literal, $sev:ident, $pat:literal, $msg:literal; )*) => {
        &[ $( PatternRule {
            name: $name,
            pattern: $pat,
            kind: $kind,
            severity: Severity::$sev,
            message: $msg,
        }, )* ]
    };
}

const MOCKS: &[PatternRule] = rules![ViolationKind::MockUsage;
    "jest-mock", High, r"\bjest\.mock\(", "jest.mock() call";
    "jest-fn", High, r"\bjest\.fn\(", "jest.fn() mock function";
    "vitest-mock", High, r"\bvi\.(mock|fn)\(", "Vitest mock: {match}";
    "sinon-mock", High, r"\bsinon\.mock\(", "sinon.mock() call";
    "mock-behavior", High, r"\.mock(ReturnValue|ResolvedValue|RejectedValue|Implementation)(Once)?\(", "Mock behavior override: {match}";
    "python-mock", High, r"(\bunittest\.mock\b|\bmock\.patch\b|@patch\b)", "Python mock: {match}";
    "mockito", High, r"\bMockito\.mock\(|\bmock\(\w+\.class\)", "Mockito mock: {match}";
    "mockall", High, r"#\[automock\]", "mockall automock attribute";
];

const STUBS: &[PatternRule] = rules![ViolationKind::StubUsage;
    "stub-call", High, r"\b(sinon|cy)\.stub\(", "Stub call: {match}";
    "stub-suffix", Medium, r"\b\w+Stub\b", "Stub identifier: {match}";
    "stub-prefix", Medium, r"\bStub\w+\b", "Stub identifier: {match}";
];

const SPIES: &[PatternRule] = rules![ViolationKind::SpyUsage;
    "spy-call", High, r"\b(jest|vi)\.spyOn\(|\bsinon\.spy\(", "Spy call: {match}";
    "spy-suffix", Medium, r"\b\w+Spy\b", "Spy identifier: {match}";
    "spy-prefix", Medium, r"\bSpy\w+\b", "Spy identifier: {match}";
];

const FAKES: &[PatternRule] = rules![ViolationKind::FakeUsage;
    "fake-name", Low, r"\b\w*[Ff]ake\w*\b", "Fake identifier: {match}";
    "dummy-name", Low, r"\b\w*[Dd]ummy\w*\b", "Dummy identifier: {match}";
];

static RULES: Lazy<RuleTable> = Lazy::new(|| {
    let mut table = RuleTable::new();
    for family in [MOCKS, STUBS, SPIES, FAKES] {
        table.extend(RuleTable::from_static(family));
    }
    table
});

fn is_test_path(source: &str) -> bool {
    let normalized = source.replace('\\', "/");
    TEST_PATH_MARKERS.iter().any(|m| normalized.contains(m))
}

/// Flags test doubles (mocks, stubs, spies, fakes) in code headed for
/// production. Reports every occurrence with its line number.
pub struct MockUsageDetector;

impl Detector for MockUsageDetector {
    fn name(&self) -> &str {
        "mock-usage-detector"
    }

    fn description(&self) -> &str {
        "Detects mock, stub, spy and fake usage in production code paths"
    }

    fn check_type(&self) -> CheckType {
        CheckType::MockDetection
    }

    fn detect(&self, input: &Input, context: Option<&Context>) -> Result<CheckResult, DetectorError> {
        if let Some(source) = context.and_then(|c| c.source.as_deref()) {
            if is_test_path(source) {
                return Ok(CheckResult::clean(CheckType::MockDetection)
                    .with_metadata("skipped", true)
                    .with_metadata("source", source));
            }
        }

        let text = extract_text(input);
        let violations = RULES.violations(&text, ScanMode::EveryOccurrence);
        let score = SCORES.score(&violations);
        Ok(CheckResult::new(
            CheckType::MockDetection,
            violations.is_empty(),
            score,
            violations,
        )
        .with_metadata("lines_scanned", text.lines().count()))
    }
}
