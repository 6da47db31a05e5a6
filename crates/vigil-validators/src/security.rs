//! Security checks modelled on NSM (Norwegian National Security Authority) guidance.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use vigil_core::{
    Issue, Result, SecurityDetails, Severity, Validator, ValidatorDetails, ValidatorReport,
};

use crate::rules::{self, Pattern, RuleSpec, RuleTable, compile, scan_all};

/// Id of the security validator.
pub const SECURITY_ID: &str = "nsm";

static SPECS: [RuleSpec; 5] = [
    RuleSpec {
        id: "hardcoded-secret",
        severity: Severity::Critical,
        pattern: r#"(?i)\b(password|passwd|secret|api_?key|access_?token|private_?key)\s*[:=]\s*["'][^"']{4,}["']"#,
        exclude: None,
        message: "Hard-coded credential found in source",
        suggestion: "Load secrets from environment variables or a secret manager",
    },
    RuleSpec {
        id: "eval-usage",
        severity: Severity::Error,
        pattern: r"\beval\s*\(|\bnew\s+Function\s*\(",
        exclude: None,
        message: "Dynamic code evaluation allows code injection",
        suggestion: "Replace eval/new Function with explicit logic or a safe parser",
    },
    RuleSpec {
        id: "unsafe-html",
        severity: Severity::Warning,
        pattern: r"\.innerHTML\s*=|dangerouslySetInnerHTML",
        exclude: None,
        message: "Raw HTML injection can lead to cross-site scripting",
        suggestion: "Render text content or sanitize HTML before injecting it",
    },
    RuleSpec {
        id: "insecure-transport",
        severity: Severity::Warning,
        pattern: r#"http://[^\s"'<>)]+"#,
        exclude: Some(r"^http://(localhost|127\.0\.0\.1)"),
        message: "Unencrypted HTTP endpoint",
        suggestion: "Use HTTPS for all external endpoints",
    },
    RuleSpec {
        id: "weak-hash",
        severity: Severity::Warning,
        pattern: r#"(?i)createHash\s*\(\s*["'](md5|sha1)["']"#,
        exclude: None,
        message: "Weak hash algorithm",
        suggestion: "Use SHA-256 or stronger",
    },
];

static RULES: RuleTable = LazyLock::new(|| compile(&SPECS));

static CLASSIFICATION: Pattern =
    LazyLock::new(|| Regex::new(r"\b(ÅPEN|BEGRENSET|KONFIDENSIELT|HEMMELIG)\b"));

/// Detects hard-coded secrets, code injection and insecure transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityValidator;

impl SecurityValidator {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for SecurityValidator {
    fn id(&self) -> &str {
        SECURITY_ID
    }

    fn description(&self) -> &str {
        "NSM security baseline: secrets, injection, transport"
    }

    async fn validate(&self, code: &str, _file_path: &str) -> Result<ValidatorReport> {
        let table = rules::rules(&RULES, SECURITY_ID)?;
        let mut issues = scan_all(table, code);

        let classification = rules::pattern(&CLASSIFICATION, SECURITY_ID)?
            .find(code)
            .map(|found| found.as_str().to_owned());
        if classification.is_none() {
            issues.push(
                Issue::new(
                    "classification-marking",
                    Severity::Info,
                    "No NSM security classification marking found",
                )
                .with_suggestion("Mark the module with its classification, e.g. // ÅPEN"),
            );
        }

        let secrets_found = issues
            .iter()
            .filter(|issue| issue.rule == "hardcoded-secret")
            .count();
        let insecure_patterns = issues
            .iter()
            .filter(|issue| issue.severity != Severity::Info && issue.rule != "hardcoded-secret")
            .count();

        Ok(ValidatorReport::from_issues(
            SECURITY_ID,
            issues,
            ValidatorDetails::Security(SecurityDetails {
                classification,
                secrets_found,
                insecure_patterns,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clean_classified_code_passes() -> Result<()> {
        let code = "// ÅPEN\nexport const fetchUser = (id) => fetch(`https://api.example.no/users/${id}`);\n";
        let report = SecurityValidator::new().validate(code, "user.ts").await?;

        assert!(report.compliant);
        assert_eq!(report.score, 100);
        assert!(matches!(
            report.details,
            ValidatorDetails::Security(SecurityDetails { classification: Some(ref level), .. }) if level == "ÅPEN"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_hardcoded_secret_is_critical() -> Result<()> {
        let code = "// BEGRENSET\nconst apiKey = \"sk-live-123456\";\n";
        let report = SecurityValidator::new().validate(code, "config.ts").await?;

        assert!(!report.compliant);
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.issues[0].line, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_localhost_http_is_allowed() -> Result<()> {
        let code = "// ÅPEN\nfetch('http://localhost:8080/health');\nfetch('http://example.com');\n";
        let report = SecurityValidator::new().validate(code, "client.ts").await?;

        assert_eq!(report.count(Severity::Warning), 1);
        assert!(report.compliant);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_classification_is_informational() -> Result<()> {
        let report = SecurityValidator::new().validate("const x = 1;", "x.ts").await?;
        assert_eq!(report.count(Severity::Info), 1);
        assert_eq!(report.score, 99);
        Ok(())
    }
}
