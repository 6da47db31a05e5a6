//! Integration tests running every built-in validator over realistic sources.

#![cfg(test)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Test code is allowed to use expect/unwrap and doesn't need panic docs"
)]

use vigil_core::{Severity, ValidatorDetails};
use vigil_validators::builtin_validators;

const PROFILE_FORM: &str = r#"// ÅPEN
import { t } from './i18n';

export function ProfileForm({ personalData }) {
  return (
    <form>
      <img src="avatar.png">
      <label htmlFor="name">{t('name')}</label>
      <input id="name" />
    </form>
  );
}
"#;

#[tokio::test]
async fn test_every_builtin_reports_on_component() {
    for validator in builtin_validators() {
        let report = validator
            .validate(PROFILE_FORM, "ProfileForm.tsx")
            .await
            .expect("validator should analyse component");

        assert_eq!(report.validator, validator.id());
        assert!(report.score <= 100);
        let has_errors = report
            .issues
            .iter()
            .any(|issue| issue.severity.is_error());
        assert_eq!(report.compliant, !has_errors);
    }
}

#[tokio::test]
async fn test_missing_alt_and_unencrypted_personal_data_fail() {
    let mut failing = Vec::new();
    for validator in builtin_validators() {
        let report = validator
            .validate(PROFILE_FORM, "ProfileForm.tsx")
            .await
            .expect("validator should analyse component");
        if !report.compliant {
            failing.push(report.validator.clone());
        }
        if let ValidatorDetails::Security(details) = &report.details {
            assert_eq!(details.classification.as_deref(), Some("ÅPEN"));
        }
    }
    failing.sort();
    assert_eq!(failing, vec!["gdpr", "wcag"]);
}

#[tokio::test]
async fn test_issue_lines_point_into_source() {
    let line_count = PROFILE_FORM.lines().count();
    for validator in builtin_validators() {
        let report = validator
            .validate(PROFILE_FORM, "ProfileForm.tsx")
            .await
            .expect("validator should analyse component");
        for issue in &report.issues {
            if let Some(line) = issue.line {
                assert!(line >= 1 && line <= line_count, "{issue:?}");
            }
            if issue.severity == Severity::Critical {
                panic!("unexpected critical issue: {issue:?}");
            }
        }
    }
}
