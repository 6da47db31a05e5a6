//! WCAG 2.1 accessibility checks for markup and JSX.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use vigil_core::{
    AccessibilityDetails, Result, Severity, Validator, ValidatorDetails, ValidatorReport,
};

use crate::rules::{self, Pattern, RuleSpec, RuleTable, compile, scan_all};

/// Id of the accessibility validator.
pub const ACCESSIBILITY_ID: &str = "wcag";

/// Conformance level the rules target.
const TARGET_LEVEL: &str = "AA";

static SPECS: [RuleSpec; 6] = [
    RuleSpec {
        id: "img-alt",
        severity: Severity::Error,
        pattern: r"<img\b[^>]*>",
        exclude: Some(r"\balt\s*="),
        message: "Image is missing alternative text",
        suggestion: "Add an alt attribute describing the image, or alt=\"\" if decorative",
    },
    RuleSpec {
        id: "button-name",
        severity: Severity::Error,
        pattern: r"<button\b[^>]*>\s*</button>",
        exclude: Some(r"\baria-label(ledby)?\s*="),
        message: "Button has no accessible name",
        suggestion: "Give the button text content or an aria-label",
    },
    RuleSpec {
        id: "click-without-role",
        severity: Severity::Warning,
        pattern: r"<(div|span)\b[^>]*\bonClick\s*=[^>]*>",
        exclude: Some(r"\brole\s*="),
        message: "Clickable element is not exposed as interactive",
        suggestion: "Use a <button> or add role and keyboard handlers",
    },
    RuleSpec {
        id: "input-label",
        severity: Severity::Warning,
        pattern: r"<input\b[^>]*>",
        exclude: Some(r#"\baria-label(ledby)?\s*=|\bid\s*=|\btype\s*=\s*["']hidden["']"#),
        message: "Form input has no associated label",
        suggestion: "Associate a <label> or add an aria-label",
    },
    RuleSpec {
        id: "positive-tabindex",
        severity: Severity::Warning,
        pattern: r#"\btab[iI]ndex\s*=\s*[{"']?\s*[1-9]"#,
        exclude: None,
        message: "Positive tabindex disrupts keyboard navigation order",
        suggestion: "Use tabindex 0 or -1 and rely on document order",
    },
    RuleSpec {
        id: "html-lang",
        severity: Severity::Info,
        pattern: r"<html\b[^>]*>",
        exclude: Some(r"\blang\s*="),
        message: "Document language is not declared",
        suggestion: "Add a lang attribute to the <html> element",
    },
];

static RULES: RuleTable = LazyLock::new(|| compile(&SPECS));

static ELEMENT: Pattern = LazyLock::new(|| Regex::new(r"<[a-zA-Z][\w-]*"));

/// Checks images, controls and keyboard order against WCAG AA.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessibilityValidator;

impl AccessibilityValidator {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for AccessibilityValidator {
    fn id(&self) -> &str {
        ACCESSIBILITY_ID
    }

    fn description(&self) -> &str {
        "WCAG 2.1 AA: alternative text, accessible names, keyboard order"
    }

    async fn validate(&self, code: &str, _file_path: &str) -> Result<ValidatorReport> {
        let issues = scan_all(rules::rules(&RULES, ACCESSIBILITY_ID)?, code);
        let elements_checked = rules::pattern(&ELEMENT, ACCESSIBILITY_ID)?
            .find_iter(code)
            .count();

        Ok(ValidatorReport::from_issues(
            ACCESSIBILITY_ID,
            issues,
            ValidatorDetails::Accessibility(AccessibilityDetails {
                level: TARGET_LEVEL.to_owned(),
                elements_checked,
            }),
        ))
    }
}
