//! Localization checks: hard-coded UI text and locale-less formatting.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use vigil_core::{
    Issue, LocaleDetails, Result, Severity, Validator, ValidatorDetails, ValidatorReport,
};

use crate::rules::{self, Pattern, RuleSpec, RuleTable, compile, line_of, scan_all};

/// Id of the localization validator.
pub const LOCALE_ID: &str = "locale";

/// Locale assumed when none is configured.
pub const DEFAULT_LOCALE: &str = "nb-NO";

static SPECS: [RuleSpec; 3] = [
    RuleSpec {
        id: "locale-less-format",
        severity: Severity::Warning,
        pattern: r"\.toLocale(Date|Time)?String\s*\(\s*\)",
        exclude: None,
        message: "Date or number formatted without an explicit locale",
        suggestion: "Pass the active locale to toLocaleString/Intl formatters",
    },
    RuleSpec {
        id: "hardcoded-locale",
        severity: Severity::Info,
        pattern: r#"["']en-US["']"#,
        exclude: None,
        message: "Locale hard-coded to en-US",
        suggestion: "Read the locale from user settings or configuration",
    },
    RuleSpec {
        id: "hardcoded-currency",
        severity: Severity::Info,
        pattern: r"\$\s?\d",
        exclude: None,
        message: "Currency symbol hard-coded in text",
        suggestion: "Format amounts with Intl.NumberFormat and a currency code",
    },
];

static RULES: RuleTable = LazyLock::new(|| compile(&SPECS));

static JSX_TEXT: Pattern = LazyLock::new(|| Regex::new(r">\s*([A-Za-zÆØÅæøå][^<>{}]{2,}?)\s*<"));

/// Flags user-facing text that bypasses translation.
#[derive(Debug, Clone)]
pub struct LocaleValidator {
    locale: String,
}

impl LocaleValidator {
    /// Creates the validator for [`DEFAULT_LOCALE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_locale(DEFAULT_LOCALE)
    }

    /// Creates the validator for `locale`.
    #[must_use]
    pub fn with_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }

    /// Locale reported in details.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Default for LocaleValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for LocaleValidator {
    fn id(&self) -> &str {
        LOCALE_ID
    }

    fn description(&self) -> &str {
        "Localization: hard-coded text, locale-less formatting"
    }

    async fn validate(&self, code: &str, _file_path: &str) -> Result<ValidatorReport> {
        let mut issues: Vec<Issue> = rules::pattern(&JSX_TEXT, LOCALE_ID)?
            .captures_iter(code)
            .filter_map(|captures| captures.get(1))
            .map(|text| {
                Issue::new(
                    "hardcoded-text",
                    Severity::Warning,
                    format!("Hard-coded UI text `{}`", text.as_str().trim()),
                )
                .at_line(line_of(code, text.start()))
                .with_suggestion("Move the text into a translation catalog and use t()")
            })
            .collect();
        let hardcoded_strings = issues.len();

        issues.extend(scan_all(rules::rules(&RULES, LOCALE_ID)?, code));

        Ok(ValidatorReport::from_issues(
            LOCALE_ID,
            issues,
            ValidatorDetails::Locale(LocaleDetails {
                locale: self.locale.clone(),
                hardcoded_strings,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hardcoded_text_is_warning() -> Result<()> {
        let code = "<h1>Velkommen til tjenesten</h1>\n<p>{t('intro')}</p>";
        let report = LocaleValidator::new().validate(code, "Home.tsx").await?;

        assert!(report.compliant);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.score, 95);
        assert!(matches!(
            report.details,
            ValidatorDetails::Locale(LocaleDetails { hardcoded_strings: 1, ref locale }) if locale == "nb-NO"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_locale_less_formatting() -> Result<()> {
        let code = "const label = date.toLocaleDateString();\nconst fmt = new Intl.NumberFormat('en-US');\n";
        let report = LocaleValidator::with_locale("en-GB").validate(code, "fmt.ts").await?;

        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.count(Severity::Info), 1);
        assert_eq!(report.score, 94);
        Ok(())
    }

    #[tokio::test]
    async fn test_translated_markup_passes() -> Result<()> {
        let code = "<button onClick={save}>{t('save')}</button>";
        let report = LocaleValidator::new().validate(code, "Save.tsx").await?;
        assert!(report.issues.is_empty());
        Ok(())
    }
}
