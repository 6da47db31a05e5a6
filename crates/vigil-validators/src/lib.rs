//! Built-in compliance validators.
//!
//! Each validator is a pattern-driven analyser implementing
//! [`vigil_core::Validator`]:
//! - `nsm`: security baseline (secrets, injection, transport, classification)
//! - `gdpr`: data protection (unencrypted personal data, logging, consent)
//! - `wcag`: accessibility (alternative text, accessible names, keyboard order)
//! - `locale`: localization (hard-coded text, locale-less formatting)
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

/// WCAG accessibility validator.
mod accessibility;
/// GDPR data-protection validator.
mod data_protection;
/// Localization validator.
mod locale;
/// Shared pattern-rule machinery.
mod rules;
/// NSM security validator.
mod security;

use std::sync::Arc;

use tracing::debug;
use vigil_core::Validator;

pub use accessibility::{ACCESSIBILITY_ID, AccessibilityValidator};
pub use data_protection::{DATA_PROTECTION_ID, DataProtectionValidator};
pub use locale::{DEFAULT_LOCALE, LOCALE_ID, LocaleValidator};
pub use security::{SECURITY_ID, SecurityValidator};

/// Ids of the built-in validators, in default execution order.
pub const BUILTIN_IDS: [&str; 4] = [SECURITY_ID, DATA_PROTECTION_ID, ACCESSIBILITY_ID, LOCALE_ID];

/// Instantiates every built-in validator.
pub fn builtin_validators() -> Vec<Arc<dyn Validator>> {
    let validators: Vec<Arc<dyn Validator>> = vec![
        Arc::new(SecurityValidator::new()),
        Arc::new(DataProtectionValidator::new()),
        Arc::new(AccessibilityValidator::new()),
        Arc::new(LocaleValidator::new()),
    ];
    debug!(count = validators.len(), "Instantiated built-in validators");
    validators
}
