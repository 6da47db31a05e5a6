use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Issue severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding
    Info,
    /// Should be fixed
    Warning,
    /// Breaks compliance
    Error,
    /// Breaks compliance and needs immediate attention
    Critical,
}

impl Severity {
    /// Score penalty applied by built-in validators for one issue.
    pub const fn penalty(self) -> u32 {
        match self {
            Self::Info => 1,
            Self::Warning => 5,
            Self::Error => 15,
            Self::Critical => 25,
        }
    }

    /// Whether this severity counts toward error totals.
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }

    /// Lowercase name used in reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

/// A single finding reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Rule identifier, e.g. `img-alt`
    pub rule: String,
    /// How serious the finding is
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// 1-based line of the finding, when known
    pub line: Option<usize>,
    /// Suggested fix, when the validator has one
    pub suggestion: Option<String>,
}

impl Issue {
    /// Creates an issue without location or suggestion.
    pub fn new<R: Into<String>, M: Into<String>>(rule: R, severity: Severity, message: M) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
            line: None,
            suggestion: None,
        }
    }

    /// Sets the 1-based line of the finding.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Sets the suggested fix.
    #[must_use]
    pub fn with_suggestion<S: Into<String>>(mut self, suggestion: S) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Security (NSM) specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDetails {
    /// NSM classification marking found in the source, if any
    pub classification: Option<String>,
    /// Number of hard-coded secrets detected
    pub secrets_found: usize,
    /// Number of insecure API usages detected
    pub insecure_patterns: usize,
}

/// Data-protection (GDPR) specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProtectionDetails {
    /// Personal-data field names found in the source
    pub personal_data_fields: Vec<String>,
    /// Whether any encryption call was found
    pub encryption_detected: bool,
    /// Whether any consent check was found
    pub consent_detected: bool,
}

/// Accessibility (WCAG) specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityDetails {
    /// WCAG conformance level checked against
    pub level: String,
    /// Number of markup elements inspected
    pub elements_checked: usize,
}

/// Locale specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleDetails {
    /// Target locale, e.g. `nb-NO`
    pub locale: String,
    /// Number of hard-coded user-facing strings
    pub hardcoded_strings: usize,
}

/// Plugin specific fields, passed through opaquely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDetails {
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Arbitrary plugin output
    pub data: JsonValue,
}

/// Validator-specific payload of a [`ValidatorReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidatorDetails {
    /// Security (NSM) validator output
    Security(SecurityDetails),
    /// Data-protection (GDPR) validator output
    DataProtection(DataProtectionDetails),
    /// Accessibility (WCAG) validator output
    Accessibility(AccessibilityDetails),
    /// Locale validator output
    Locale(LocaleDetails),
    /// Plugin output
    Plugin(PluginDetails),
    /// No validator-specific fields
    None,
}

impl ValidatorDetails {
    /// Short category name used when deriving next steps.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Security(_) => "security",
            Self::DataProtection(_) => "data protection",
            Self::Accessibility(_) => "accessibility",
            Self::Locale(_) => "localization",
            Self::Plugin(_) => "plugin",
            Self::None => "general",
        }
    }
}

/// Generic result contract every validator produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorReport {
    /// Id of the validator that produced this report
    pub validator: String,
    /// Compliance score (0 to 100)
    pub score: u8,
    /// Whether the validator considers the input compliant
    pub compliant: bool,
    /// Findings
    pub issues: Vec<Issue>,
    /// Validator-specific fields
    pub details: ValidatorDetails,
}

impl ValidatorReport {
    /// Builds a report scored from its issues.
    ///
    /// The score is `100` minus the summed severity penalties, floored at zero.
    /// The report is compliant when no error or critical issue is present.
    pub fn from_issues<V: Into<String>>(
        validator: V,
        issues: Vec<Issue>,
        details: ValidatorDetails,
    ) -> Self {
        let penalty: u32 = issues.iter().map(|issue| issue.severity.penalty()).sum();
        let score = 100_u32.saturating_sub(penalty) as u8;
        let compliant = !issues.iter().any(|issue| issue.severity.is_error());

        Self {
            validator: validator.into(),
            score,
            compliant,
            issues,
            details,
        }
    }

    /// Counts issues of exactly the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}
