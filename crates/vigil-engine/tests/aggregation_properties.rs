//! Property-based tests for result aggregation
//!
//! These tests verify invariants that hold for any set of validator runs:
//! - The overall score stays within 0 to 100 and is the rounded mean
//! - Compliance follows the error count and the score threshold
//! - Failed runs never contribute to totals
//! - Recommendations are ordered by priority

#![cfg(test)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Test code is allowed to use expect/unwrap and doesn't need panic docs"
)]

use std::time::Duration;

use proptest::prelude::*;
use vigil_core::result::COMPLIANCE_THRESHOLD;
use vigil_core::{Issue, Severity, ValidatorDetails, ValidatorReport};
use vigil_engine::aggregator::{AggregationInput, aggregate, overall_score};
use vigil_engine::resources::ResourceUsage;
use vigil_engine::{EngineError, ValidatorRun};

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
        Just(Severity::Critical),
    ]
}

/// A run that either reports the given severities or failed outright.
fn run() -> impl Strategy<Value = (bool, Vec<Severity>)> {
    (any::<bool>(), prop::collection::vec(severity(), 0..8))
}

fn build_runs(specs: &[(bool, Vec<Severity>)]) -> Vec<ValidatorRun> {
    specs
        .iter()
        .enumerate()
        .map(|(index, (failed, severities))| {
            let id = format!("validator-{index}");
            let outcome = if *failed {
                Err(EngineError::ValidatorFailed {
                    validator: id.clone(),
                    message: "boom".to_owned(),
                })
            } else {
                let issues = severities
                    .iter()
                    .enumerate()
                    .map(|(line, &severity)| {
                        Issue::new("rule", severity, format!("issue {line}")).at_line(line + 1)
                    })
                    .collect();
                Ok(ValidatorReport::from_issues(
                    id.clone(),
                    issues,
                    ValidatorDetails::None,
                ))
            };
            ValidatorRun {
                validator: id,
                outcome,
                elapsed: Duration::from_millis(3),
            }
        })
        .collect()
}

fn input(runs: &[ValidatorRun]) -> AggregationInput<'_> {
    AggregationInput {
        file_path: "prop.tsx",
        code: "const value = 1;\n",
        runs,
        previous: None,
        retry_count: 0,
        elapsed: Duration::from_millis(10),
        resources: ResourceUsage::default(),
    }
}

proptest! {
    /// Property: the overall score is the rounded mean and never exceeds 100
    #[test]
    fn prop_overall_score_is_bounded_mean(scores in prop::collection::vec(any::<u8>(), 1..12)) {
        let score = overall_score(scores.iter().copied());
        prop_assert!(score <= 100);

        let clamped: Vec<f64> = scores.iter().map(|&value| f64::from(value.min(100))).collect();
        let mean = clamped.iter().sum::<f64>() / clamped.len() as f64;
        prop_assert!((f64::from(score) - mean).abs() <= 0.5);
    }

    /// Property: a result is compliant exactly when it has no errors and
    /// reaches the score threshold
    #[test]
    fn prop_compliance_rule_holds(specs in prop::collection::vec(run(), 0..6)) {
        let runs = build_runs(&specs);
        let result = aggregate(&input(&runs));

        prop_assert!(result.overall_score <= 100);
        prop_assert_eq!(
            result.overall_compliant,
            result.total_errors == 0 && result.overall_score >= COMPLIANCE_THRESHOLD
        );
    }

    /// Property: only runs that produced a report are counted
    #[test]
    fn prop_failed_runs_contribute_nothing(specs in prop::collection::vec(run(), 0..6)) {
        let runs = build_runs(&specs);
        let result = aggregate(&input(&runs));

        let reported: Vec<&(bool, Vec<Severity>)> =
            specs.iter().filter(|(failed, _)| !failed).collect();
        let issues: usize = reported.iter().map(|(_, severities)| severities.len()).sum();
        let errors = reported
            .iter()
            .flat_map(|(_, severities)| severities.iter())
            .filter(|severity| severity.is_error())
            .count();

        prop_assert_eq!(result.metadata.validators_run.len(), reported.len());
        prop_assert_eq!(result.validation_results.len(), reported.len());
        prop_assert_eq!(result.total_issues, issues);
        prop_assert_eq!(result.total_errors, errors);
        prop_assert_eq!(result.summary.passed + result.summary.failed, reported.len());
        if reported.is_empty() {
            prop_assert_eq!(result.overall_score, 0);
        }
    }

    /// Property: recommendations cover every issue, most urgent first
    #[test]
    fn prop_recommendations_are_ranked(specs in prop::collection::vec(run(), 0..6)) {
        let runs = build_runs(&specs);
        let result = aggregate(&input(&runs));

        prop_assert_eq!(result.recommendations.len(), result.total_issues);
        prop_assert!(
            result
                .recommendations
                .windows(2)
                .all(|pair| pair[0].priority <= pair[1].priority)
        );
    }
}
