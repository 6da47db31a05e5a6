//! Turns per-validator runs into one scored, ranked [`AggregatedResult`].

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use regex::{Error as RegexError, Regex};
use tracing::warn;
use vigil_core::{
    AggregatedResult, ComplianceLevel, CoverageMetrics, Issue, PerformanceMetrics, Recommendation,
    ResultMetadata, ResultSummary, Severity, TrendDeltas, ValidatorReport,
};

use crate::executor::ValidatorRun;
use crate::resources::ResourceUsage;

type Pattern = LazyLock<Result<Regex, RegexError>>;

static FUNCTIONS: Pattern = LazyLock::new(|| {
    Regex::new(
        r"(?m)\bfunction\s*\*?\s*\w+\s*\(|\bfn\s+\w+|\b(?:const|let|var)\s+\w+\s*=\s*(?:async\s*)?(?:\([^)]*\)|\w+)\s*=>|^\s*(?:public\s+|private\s+|protected\s+|static\s+|async\s+)*\w+\s*\([^)]*\)\s*\{",
    )
});

static CONTROL_FLOW: Pattern =
    LazyLock::new(|| Regex::new(r"^\s*(?:if|for|while|switch|catch|return)\b"));

static COMPONENTS: Pattern = LazyLock::new(|| {
    Regex::new(r"\b(?:function|class|const|let)\s+[A-Z][a-z0-9]\w*")
});

/// Everything the aggregator needs from one execution.
pub struct AggregationInput<'run> {
    /// Path of the analysed file
    pub file_path: &'run str,
    /// Analysed content
    pub code: &'run str,
    /// Runs in resolved order
    pub runs: &'run [ValidatorRun],
    /// Most recent previous result, used for trends
    pub previous: Option<&'run AggregatedResult>,
    /// Retries the execution phase needed
    pub retry_count: u32,
    /// Wall-clock duration of the whole call so far
    pub elapsed: Duration,
    /// Resource reading taken after execution
    pub resources: ResourceUsage,
}

/// Aggregates the runs that produced a report. Failed runs contribute nothing.
pub fn aggregate(input: &AggregationInput<'_>) -> AggregatedResult {
    let contributing: Vec<(&ValidatorRun, &ValidatorReport)> = input
        .runs
        .iter()
        .filter_map(|run| run.report().map(|report| (run, report)))
        .collect();
    let reports: Vec<&ValidatorReport> = contributing.iter().map(|(_, report)| *report).collect();

    let count = |severity: Severity| -> usize {
        reports.iter().map(|report| report.count(severity)).sum()
    };
    let total_issues: usize = reports.iter().map(|report| report.issues.len()).sum();
    let total_warnings = count(Severity::Warning);
    let critical_issues = count(Severity::Critical);
    let total_errors = count(Severity::Error) + critical_issues;

    let overall_score = overall_score(reports.iter().map(|report| report.score));
    let elapsed_ms = input.elapsed.as_millis() as u64;

    let passed = reports.iter().filter(|report| report.compliant).count();
    let summary = ResultSummary {
        passed,
        failed: reports.len() - passed,
        warnings: total_warnings,
        critical_issues,
        compliance_level: ComplianceLevel::classify(total_errors, overall_score),
        next_steps: next_steps(&reports, critical_issues, total_errors),
    };

    AggregatedResult {
        timestamp: Utc::now(),
        execution_duration_ms: elapsed_ms,
        overall_compliant: AggregatedResult::compliance_rule(total_errors, overall_score),
        overall_score,
        total_issues,
        total_warnings,
        total_errors,
        validation_results: contributing
            .iter()
            .map(|(run, report)| (run.validator.clone(), (*report).clone()))
            .collect(),
        metadata: ResultMetadata {
            file_path: input.file_path.to_owned(),
            file_size: input.code.len(),
            line_count: input.code.lines().count(),
            validators_run: contributing
                .iter()
                .map(|(run, _)| run.validator.clone())
                .collect(),
            cache_hit: false,
            retry_count: input.retry_count,
        },
        performance: PerformanceMetrics {
            total_time_ms: elapsed_ms,
            per_validator_time_ms: contributing
                .iter()
                .map(|(run, _)| (run.validator.clone(), run.elapsed.as_millis() as u64))
                .collect::<BTreeMap<_, _>>(),
            memory_usage: input.resources.memory_bytes,
            cpu_usage: input.resources.cpu_percent,
        },
        coverage: coverage(input.code),
        trends: trends(overall_score, total_issues, input.previous),
        recommendations: recommendations(&contributing),
        summary,
    }
}

/// Rounded mean of the scores, 0 when there are none, never above 100.
pub fn overall_score<I: IntoIterator<Item = u8>>(scores: I) -> u8 {
    let (sum, count) = scores
        .into_iter()
        .fold((0_u64, 0_u64), |(sum, count), score| {
            (sum + u64::from(score.min(100)), count + 1)
        });
    if count == 0 {
        return 0;
    }
    let mean = sum as f64 / count as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Urgency of a severity, 1 being most urgent.
pub const fn priority(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 1,
        Severity::Error => 2,
        Severity::Warning => 3,
        Severity::Info => 4,
    }
}

/// Rough effort to address an issue of `severity`.
pub const fn effort_estimate(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "high",
        Severity::Error => "medium",
        Severity::Warning => "low",
        Severity::Info => "minimal",
    }
}

fn recommendation(validator: &str, issue: &Issue) -> Recommendation {
    Recommendation {
        kind: validator.to_owned(),
        severity: issue.severity,
        message: issue.message.clone(),
        action: issue
            .suggestion
            .clone()
            .unwrap_or_else(|| format!("Review and fix `{}`", issue.rule)),
        effort_estimate: effort_estimate(issue.severity).to_owned(),
        priority: priority(issue.severity),
    }
}

/// Flattens every issue, most urgent first. Equal priorities keep run order.
fn recommendations(contributing: &[(&ValidatorRun, &ValidatorReport)]) -> Vec<Recommendation> {
    let mut ranked: Vec<Recommendation> = contributing
        .iter()
        .flat_map(|(run, report)| {
            report
                .issues
                .iter()
                .map(move |issue| recommendation(&run.validator, issue))
        })
        .collect();
    ranked.sort_by_key(|entry| entry.priority);
    ranked
}

/// Deltas against the previous result; all zero without one.
pub fn trends(score: u8, total_issues: usize, previous: Option<&AggregatedResult>) -> TrendDeltas {
    let Some(previous) = previous else {
        return TrendDeltas::default();
    };
    TrendDeltas {
        score_improvement: i32::from(score) - i32::from(previous.overall_score),
        issue_reduction: previous.total_issues as i64 - total_issues as i64,
        compliance_progress: (f64::from(score) - 50.0) / 50.0 * 100.0,
    }
}

fn next_steps(reports: &[&ValidatorReport], critical: usize, errors: usize) -> Vec<String> {
    let mut steps = Vec::new();
    if critical > 0 {
        steps.push("Address critical issues immediately".to_owned());
    }
    if errors > critical {
        steps.push("Resolve compliance errors before release".to_owned());
    }

    let mut categories: Vec<&str> = Vec::new();
    for report in reports {
        let has_problems = report
            .issues
            .iter()
            .any(|issue| issue.severity >= Severity::Warning);
        let category = report.details.category();
        if has_problems && !categories.contains(&category) {
            categories.push(category);
        }
    }
    steps.extend(
        categories
            .into_iter()
            .map(|category| format!("Review {category} issues")),
    );

    if steps.is_empty() {
        steps.push("Maintain current compliance level".to_owned());
    }
    steps
}

fn count_matches(pattern: &Pattern, code: &str, skip: Option<&Regex>) -> usize {
    match pattern.as_ref() {
        Ok(regex) => regex
            .find_iter(code)
            .filter(|found| skip.is_none_or(|control| !control.is_match(found.as_str())))
            .count(),
        Err(error) => {
            warn!(%error, "Coverage pattern failed to compile");
            0
        }
    }
}

/// Counts lines, function-like declarations and component declarations.
pub fn coverage(code: &str) -> CoverageMetrics {
    let control_flow = CONTROL_FLOW.as_ref().ok();
    CoverageMetrics {
        lines_analyzed: code.lines().count(),
        functions_analyzed: count_matches(&FUNCTIONS, code, control_flow),
        components_analyzed: count_matches(&COMPONENTS, code, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use vigil_core::ValidatorDetails;

    fn run(validator: &str, issues: Vec<Issue>) -> ValidatorRun {
        ValidatorRun {
            validator: validator.to_owned(),
            outcome: Ok(ValidatorReport::from_issues(
                validator,
                issues,
                ValidatorDetails::None,
            )),
            elapsed: Duration::from_millis(3),
        }
    }

    fn failed(validator: &str) -> ValidatorRun {
        ValidatorRun {
            validator: validator.to_owned(),
            outcome: Err(EngineError::Timeout {
                validator: validator.to_owned(),
                timeout_ms: 10,
            }),
            elapsed: Duration::from_millis(10),
        }
    }

    fn input<'run>(
        runs: &'run [ValidatorRun],
        previous: Option<&'run AggregatedResult>,
    ) -> AggregationInput<'run> {
        AggregationInput {
            file_path: "a.tsx",
            code: "line one\nline two\n",
            runs,
            previous,
            retry_count: 0,
            elapsed: Duration::from_millis(12),
            resources: ResourceUsage::default(),
        }
    }

    #[test]
    fn test_overall_score_rounds_mean() {
        assert_eq!(overall_score([]), 0);
        assert_eq!(overall_score([100, 85]), 93);
        assert_eq!(overall_score([90, 91]), 91);
    }

    #[test]
    fn test_failed_runs_contribute_nothing() {
        let runs = [run("nsm", Vec::new()), failed("wcag")];
        let result = aggregate(&input(&runs, None));

        assert_eq!(result.overall_score, 100);
        assert!(result.overall_compliant);
        assert_eq!(result.metadata.validators_run, vec!["nsm"]);
        assert!(!result.validation_results.contains_key("wcag"));
        assert_eq!(result.performance.per_validator_time_ms.get("nsm"), Some(&3));
        assert_eq!(result.metadata.line_count, 2);
    }

    #[test]
    fn test_no_contributors_scores_zero() {
        let runs = [failed("nsm")];
        let result = aggregate(&input(&runs, None));
        assert_eq!(result.overall_score, 0);
        assert!(!result.overall_compliant);
        assert_eq!(result.summary.compliance_level, ComplianceLevel::Poor);
    }

    #[test]
    fn test_totals_count_critical_as_errors() {
        let runs = [
            run(
                "nsm",
                vec![
                    Issue::new("secret", Severity::Critical, "secret"),
                    Issue::new("http", Severity::Warning, "http"),
                ],
            ),
            run("wcag", vec![Issue::new("alt", Severity::Error, "alt")]),
        ];
        let result = aggregate(&input(&runs, None));

        assert_eq!(result.total_issues, 3);
        assert_eq!(result.total_errors, 2);
        assert_eq!(result.total_warnings, 1);
        assert_eq!(result.summary.critical_issues, 1);
        assert_eq!(result.summary.failed, 2);
        assert_eq!(result.summary.compliance_level, ComplianceLevel::NonCompliant);
        assert_eq!(
            result.summary.next_steps[..2],
            [
                "Address critical issues immediately".to_owned(),
                "Resolve compliance errors before release".to_owned()
            ]
        );
    }

    #[test]
    fn test_recommendations_ranked_stably() {
        let runs = [
            run(
                "locale",
                vec![
                    Issue::new("a", Severity::Info, "info first"),
                    Issue::new("b", Severity::Warning, "warning first"),
                ],
            ),
            run(
                "wcag",
                vec![
                    Issue::new("c", Severity::Warning, "warning second"),
                    Issue::new("d", Severity::Error, "error"),
                ],
            ),
        ];
        let result = aggregate(&input(&runs, None));
        let messages: Vec<&str> = result
            .recommendations
            .iter()
            .map(|entry| entry.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec!["error", "warning first", "warning second", "info first"]
        );
        assert_eq!(result.recommendations[0].kind, "wcag");
        assert_eq!(result.recommendations[0].effort_estimate, "medium");
        assert_eq!(result.recommendations[3].action, "Review and fix `a`");
    }

    #[test]
    fn test_trends_against_previous() {
        let first_runs = [run("wcag", vec![Issue::new("alt", Severity::Error, "alt")])];
        let first = aggregate(&input(&first_runs, None));
        assert_eq!(first.trends, TrendDeltas::default());

        let second_runs = [run("wcag", Vec::new())];
        let second = aggregate(&input(&second_runs, Some(&first)));
        assert_eq!(second.trends.score_improvement, 15);
        assert_eq!(second.trends.issue_reduction, 1);
        assert!((second.trends.compliance_progress - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clean_result_next_step() {
        let runs = [run("nsm", Vec::new())];
        let result = aggregate(&input(&runs, None));
        assert_eq!(result.summary.next_steps, vec!["Maintain current compliance level"]);
        assert_eq!(result.summary.compliance_level, ComplianceLevel::Excellent);
    }

    #[test]
    fn test_coverage_counts_declarations() {
        let code = r"export function ProfileCard({ user }) {
  const format = (value) => value.trim();
  if (user) {
    return format(user.name);
  }
}
class UserStore {
  load(id) {
    return id;
  }
}
const API_URL = 'https://example.no';
";
        let coverage = coverage(code);
        assert_eq!(coverage.lines_analyzed, 12);
        assert_eq!(coverage.functions_analyzed, 3);
        assert_eq!(coverage.components_analyzed, 2);
    }
}
