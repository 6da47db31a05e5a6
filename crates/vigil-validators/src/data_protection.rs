//! GDPR data-protection checks.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use vigil_core::{
    DataProtectionDetails, Issue, Result, Severity, Validator, ValidatorDetails, ValidatorReport,
};

use crate::rules::{self, Pattern, RuleSpec, RuleTable, compile, line_of, scan_all};

/// Id of the data-protection validator.
pub const DATA_PROTECTION_ID: &str = "gdpr";

const PERSONAL_FIELDS: &str = r"\b(personalData|personal_data|personnummer|fødselsnummer|fodselsnummer|ssn|socialSecurityNumber|dateOfBirth|date_of_birth|email|phoneNumber|phone_number|homeAddress)\b";

static PERSONAL_DATA: Pattern = LazyLock::new(|| Regex::new(PERSONAL_FIELDS));

static ENCRYPTION: Pattern = LazyLock::new(|| {
    Regex::new(r"(?i)(\bencrypt\w*\s*\(|crypto\.subtle|createCipheriv|\bbcrypt\b|\bargon2\b)")
});

static CONSENT: Pattern = LazyLock::new(|| Regex::new(r"(?i)consent"));

static SPECS: [RuleSpec; 2] = [
    RuleSpec {
        id: "personal-data-logged",
        severity: Severity::Warning,
        pattern: r"console\.(log|info|debug|warn|error)\s*\([^)]*\b(personalData|personal_data|personnummer|fødselsnummer|ssn|email|phoneNumber)\b",
        exclude: None,
        message: "Personal data written to logs",
        suggestion: "Remove personal data from log statements or mask it",
    },
    RuleSpec {
        id: "data-retention",
        severity: Severity::Info,
        pattern: r"(?i)localStorage\.setItem\s*\(",
        exclude: None,
        message: "Data persisted in browser storage without a retention policy",
        suggestion: "Document the retention period and clear stored data when no longer needed",
    },
];

static RULES: RuleTable = LazyLock::new(|| compile(&SPECS));

static COOKIE_WRITE: Pattern = LazyLock::new(|| Regex::new(r"document\.cookie\s*="));

/// Detects personal data handled without encryption, logging or consent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataProtectionValidator;

impl DataProtectionValidator {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for DataProtectionValidator {
    fn id(&self) -> &str {
        DATA_PROTECTION_ID
    }

    fn description(&self) -> &str {
        "GDPR data protection: encryption, logging, consent"
    }

    async fn validate(&self, code: &str, _file_path: &str) -> Result<ValidatorReport> {
        let encryption_detected = rules::pattern(&ENCRYPTION, DATA_PROTECTION_ID)?.is_match(code);
        let consent_detected = rules::pattern(&CONSENT, DATA_PROTECTION_ID)?.is_match(code);

        let mut personal_data_fields: Vec<String> = Vec::new();
        let mut issues = Vec::new();
        for found in rules::pattern(&PERSONAL_DATA, DATA_PROTECTION_ID)?.find_iter(code) {
            let field = found.as_str();
            if personal_data_fields.iter().any(|known| known == field) {
                continue;
            }
            personal_data_fields.push(field.to_owned());

            if !encryption_detected {
                issues.push(
                    Issue::new(
                        "unencrypted-personal-data",
                        Severity::Error,
                        format!("Personal data field `{field}` is handled without encryption"),
                    )
                    .at_line(line_of(code, found.start()))
                    .with_suggestion("Encrypt personal data at rest and in transit"),
                );
            }
        }

        issues.extend(scan_all(rules::rules(&RULES, DATA_PROTECTION_ID)?, code));

        if !consent_detected {
            issues.extend(
                rules::pattern(&COOKIE_WRITE, DATA_PROTECTION_ID)?
                    .find_iter(code)
                    .map(|found| {
                        Issue::new(
                            "cookie-without-consent",
                            Severity::Warning,
                            "Cookie set without checking user consent",
                        )
                        .at_line(line_of(code, found.start()))
                        .with_suggestion("Check consent before setting non-essential cookies")
                    }),
            );
        }

        Ok(ValidatorReport::from_issues(
            DATA_PROTECTION_ID,
            issues,
            ValidatorDetails::DataProtection(DataProtectionDetails {
                personal_data_fields,
                encryption_detected,
                consent_detected,
            }),
        ))
    }
}
