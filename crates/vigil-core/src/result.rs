use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Severity, ValidatorReport};

/// Score at or above which a result with no errors is compliant.
pub const COMPLIANCE_THRESHOLD: u8 = 85;

/// Unified, scored output of running a set of validators once.
///
/// Produced once by the aggregator and never mutated afterwards; cache hits
/// hand out a copy with adjusted metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    /// When the result was produced
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds
    pub execution_duration_ms: u64,
    /// `total_errors == 0 && overall_score >= 85`
    pub overall_compliant: bool,
    /// Rounded mean of contributing validator scores (0 to 100)
    pub overall_score: u8,
    /// Number of issues of any severity
    pub total_issues: usize,
    /// Number of warning issues
    pub total_warnings: usize,
    /// Number of error and critical issues
    pub total_errors: usize,
    /// Raw report of each contributing validator, keyed by validator id
    pub validation_results: BTreeMap<String, ValidatorReport>,
    /// Run metadata
    pub metadata: ResultMetadata,
    /// Timing and resource usage
    pub performance: PerformanceMetrics,
    /// What was analysed
    pub coverage: CoverageMetrics,
    /// Change relative to the previous run
    pub trends: TrendDeltas,
    /// Flattened issues ranked by priority
    pub recommendations: Vec<Recommendation>,
    /// Human-oriented summary
    pub summary: ResultSummary,
}

impl AggregatedResult {
    /// Returns the compliance rule applied to every result.
    pub const fn compliance_rule(total_errors: usize, overall_score: u8) -> bool {
        total_errors == 0 && overall_score >= COMPLIANCE_THRESHOLD
    }
}

/// Metadata describing the input and the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Path of the analysed file
    pub file_path: String,
    /// Size of the analysed content in bytes
    pub file_size: usize,
    /// Number of lines in the analysed content
    pub line_count: usize,
    /// Ids of the validators that contributed a report
    pub validators_run: Vec<String>,
    /// Whether this result was served from the cache
    pub cache_hit: bool,
    /// Number of retries the run needed
    pub retry_count: u32,
}

/// Timing and resource usage of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Total run time in milliseconds
    pub total_time_ms: u64,
    /// Measured elapsed time per contributing validator in milliseconds
    pub per_validator_time_ms: BTreeMap<String, u64>,
    /// Resident memory of the process in bytes, if available
    pub memory_usage: Option<u64>,
    /// CPU usage of the process in percent, if available
    pub cpu_usage: Option<f32>,
}

/// What the run analysed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageMetrics {
    /// Lines analysed
    pub lines_analyzed: usize,
    /// Function-like declarations found
    pub functions_analyzed: usize,
    /// Component declarations found
    pub components_analyzed: usize,
}

/// Change relative to the most recent previous result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDeltas {
    /// `current score - previous score`
    pub score_improvement: i32,
    /// `previous total issues - current total issues`
    pub issue_reduction: i64,
    /// `(current score - 50) / 50 * 100`
    pub compliance_progress: f64,
}

/// One ranked, actionable entry derived from a validator issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Validator id the issue came from
    #[serde(rename = "type")]
    pub kind: String,
    /// Severity of the underlying issue
    pub severity: Severity,
    /// Issue message
    pub message: String,
    /// What to do about it
    pub action: String,
    /// Rough effort to fix
    pub effort_estimate: String,
    /// 1 is most urgent
    pub priority: u8,
}

/// Overall compliance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceLevel {
    /// At least one error exists
    #[serde(rename = "Non-compliant")]
    NonCompliant,
    /// Score of 95 or more
    Excellent,
    /// Score of 85 or more
    Good,
    /// Score of 70 or more
    Fair,
    /// Anything lower
    Poor,
}

impl ComplianceLevel {
    /// Classifies a result by error count and score.
    pub const fn classify(total_errors: usize, score: u8) -> Self {
        if total_errors > 0 {
            Self::NonCompliant
        } else if score >= 95 {
            Self::Excellent
        } else if score >= 85 {
            Self::Good
        } else if score >= 70 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Display label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::NonCompliant => "Non-compliant",
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Human-oriented summary of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    /// Validators that reported compliant
    pub passed: usize,
    /// Validators that reported non-compliant
    pub failed: usize,
    /// Number of warning issues
    pub warnings: usize,
    /// Number of critical issues
    pub critical_issues: usize,
    /// Overall tier
    pub compliance_level: ComplianceLevel,
    /// Suggested follow-ups
    pub next_steps: Vec<String>,
}
