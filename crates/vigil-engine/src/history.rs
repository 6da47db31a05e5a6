//! Bounded log of past results and the summary metrics derived from it.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_core::AggregatedResult;

/// Maximum number of results kept.
pub const HISTORY_CAPACITY: usize = 50;

/// Number of entries reported in [`ComplianceMetrics::common_issues`].
const COMMON_ISSUE_LIMIT: usize = 5;

/// A recommendation message and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonIssue {
    /// Recommendation message
    pub message: String,
    /// Occurrences across the history
    pub count: usize,
}

/// Summary statistics over the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMetrics {
    /// Number of results in the history
    pub total_validations: usize,
    /// Mean overall score, 0 when empty
    pub average_score: f64,
    /// Percentage of compliant results, 0 when empty
    pub compliance_rate: f64,
    /// Most frequent recommendation messages, most frequent first
    pub common_issues: Vec<CommonIssue>,
}

/// FIFO-bounded sequence of aggregated results.
#[derive(Debug, Clone)]
pub struct ValidationHistory {
    entries: VecDeque<AggregatedResult>,
    capacity: usize,
}

impl ValidationHistory {
    /// Creates an empty history holding [`HISTORY_CAPACITY`] results.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates an empty history holding at most `capacity` results.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a result, returning the evicted oldest result if the bound was exceeded.
    pub fn push(&mut self, result: AggregatedResult) -> Option<AggregatedResult> {
        self.entries.push_back(result);
        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_front();
            debug!(capacity = self.capacity, "History full, evicted oldest result");
            evicted
        } else {
            None
        }
    }

    /// Most recently appended result.
    pub fn latest(&self) -> Option<&AggregatedResult> {
        self.entries.back()
    }

    /// Results, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &AggregatedResult> {
        self.entries.iter()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Computes summary metrics over the stored results.
    pub fn metrics(&self) -> ComplianceMetrics {
        let total_validations = self.entries.len();
        if total_validations == 0 {
            return ComplianceMetrics::default();
        }

        let score_sum: f64 = self
            .entries
            .iter()
            .map(|result| f64::from(result.overall_score))
            .sum();
        let compliant = self
            .entries
            .iter()
            .filter(|result| result.overall_compliant)
            .count();

        ComplianceMetrics {
            total_validations,
            average_score: score_sum / total_validations as f64,
            compliance_rate: compliant as f64 / total_validations as f64 * 100.0,
            common_issues: self.common_issues(),
        }
    }

    /// Counts recommendation messages, keeping first-seen order for ties.
    fn common_issues(&self) -> Vec<CommonIssue> {
        let mut counts: Vec<CommonIssue> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for recommendation in self
            .entries
            .iter()
            .flat_map(|result| result.recommendations.iter())
        {
            let message = recommendation.message.as_str();
            if let Some(&position) = positions.get(message) {
                counts[position].count += 1;
            } else {
                positions.insert(message, counts.len());
                counts.push(CommonIssue {
                    message: message.to_owned(),
                    count: 1,
                });
            }
        }

        counts.sort_by(|left, right| right.count.cmp(&left.count));
        counts.truncate(COMMON_ISSUE_LIMIT);
        counts
    }
}

impl Default for ValidationHistory {
    fn default() -> Self {
        Self::new()
    }
}
