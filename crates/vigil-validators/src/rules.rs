//! Table-driven pattern rules shared by the built-in validators.

use std::sync::LazyLock;

use regex::{Error as RegexError, Regex};
use vigil_core::{Error, Issue, Result, Severity};

/// Static description of one pattern rule.
pub struct RuleSpec {
    /// Rule identifier reported in issues
    pub id: &'static str,
    /// Severity of each match
    pub severity: Severity,
    /// Pattern whose matches are findings
    pub pattern: &'static str,
    /// Matches whose text also matches this pattern are ignored
    pub exclude: Option<&'static str>,
    /// Issue message
    pub message: &'static str,
    /// Suggested fix
    pub suggestion: &'static str,
}

/// A [`RuleSpec`] with its patterns compiled.
pub struct CompiledRule {
    spec: &'static RuleSpec,
    pattern: Regex,
    exclude: Option<Regex>,
}

impl CompiledRule {
    /// Rule identifier.
    #[allow(dead_code, reason = "rule accessor kept for callers; module is crate-private")]
    pub fn id(&self) -> &'static str {
        self.spec.id
    }

    /// Runs the rule over `code`, returning one issue per accepted match.
    pub fn scan(&self, code: &str) -> Vec<Issue> {
        self.pattern
            .find_iter(code)
            .filter(|found| {
                self.exclude
                    .as_ref()
                    .is_none_or(|exclude| !exclude.is_match(found.as_str()))
            })
            .map(|found| {
                Issue::new(self.spec.id, self.spec.severity, self.spec.message)
                    .at_line(line_of(code, found.start()))
                    .with_suggestion(self.spec.suggestion)
            })
            .collect()
    }
}

/// Compiles a rule table.
///
/// # Errors
/// Returns the first pattern compilation error.
pub fn compile(specs: &'static [RuleSpec]) -> core::result::Result<Vec<CompiledRule>, RegexError> {
    specs
        .iter()
        .map(|spec| {
            Ok(CompiledRule {
                spec,
                pattern: Regex::new(spec.pattern)?,
                exclude: spec.exclude.map(Regex::new).transpose()?,
            })
        })
        .collect()
}

/// Lazily compiled rule table.
pub type RuleTable = LazyLock<core::result::Result<Vec<CompiledRule>, RegexError>>;

/// Lazily compiled single pattern.
pub type Pattern = LazyLock<core::result::Result<Regex, RegexError>>;

/// Borrows a compiled rule table, reporting compilation failure against `validator`.
///
/// # Errors
/// Returns [`Error::Validator`] if any pattern failed to compile.
pub fn rules<'table>(table: &'table RuleTable, validator: &str) -> Result<&'table [CompiledRule]> {
    table
        .as_ref()
        .map(Vec::as_slice)
        .map_err(|error| Error::validator(validator, error.to_string()))
}

/// Borrows a compiled pattern, reporting compilation failure against `validator`.
///
/// # Errors
/// Returns [`Error::Validator`] if the pattern failed to compile.
pub fn pattern<'pattern>(pattern: &'pattern Pattern, validator: &str) -> Result<&'pattern Regex> {
    pattern
        .as_ref()
        .map_err(|error| Error::validator(validator, error.to_string()))
}

/// Runs every rule of a table over `code`.
pub fn scan_all(rules: &[CompiledRule], code: &str) -> Vec<Issue> {
    rules.iter().flat_map(|rule| rule.scan(code)).collect()
}

/// 1-based line number of a byte offset.
pub fn line_of(code: &str, offset: usize) -> usize {
    code.get(..offset)
        .map_or(1, |prefix| prefix.matches('\n').count() + 1)
}
