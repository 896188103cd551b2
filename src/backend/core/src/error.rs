//! Error handling for the lazy-pattern primitives.
//!
//! This module provides:
//! - A single error type with a machine-readable code, context and chaining
//! - Stable numeric codes grouped by category (sourcing, constraint, pool, config)
//! - Retry classification for callers implementing their own backoff
//! - Error logging with tracing integration
//! - Metrics integration for error tracking
//!
//! # Usage
//!
//! ```rust,ignore
//! use lazy_pattern_core::error::{PatternError, Result, ErrorContext};
//!
//! fn load() -> Result<String> {
//!     std::fs::read_to_string("registry.toml")
//!         .context("Failed to read registry file")
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for lazy-pattern operations.
pub type Result<T> = std::result::Result<T, PatternError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be matched on by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Sourcing Errors (1000-1099)
    UnknownLabel,
    UnknownOrder,

    // Constraint Errors (1100-1199)
    ConstraintViolation,
    UnknownConstraintLabel,
    InvalidConstraint,

    // Pool Errors (2000-2099)
    PoolExhausted,
    ForeignInstance,
    DoubleRelease,
    FactoryFailed,
    PoolClosed,
    PoolBusy,
    FetchCancelled,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    InvalidConfiguration,
    MissingConfiguration,

    // Serialization Errors (5100-5199)
    SerializationError,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::UnknownLabel => 1000,
            Self::UnknownOrder => 1001,

            Self::ConstraintViolation => 1100,
            Self::UnknownConstraintLabel => 1101,
            Self::InvalidConstraint => 1102,

            Self::PoolExhausted => 2000,
            Self::ForeignInstance => 2001,
            Self::DoubleRelease => 2002,
            Self::FactoryFailed => 2003,
            Self::PoolClosed => 2004,
            Self::PoolBusy => 2005,
            Self::FetchCancelled => 2006,

            Self::ConfigurationError => 5000,
            Self::InvalidConfiguration => 5001,
            Self::MissingConfiguration => 5002,

            Self::SerializationError => 5100,

            Self::InternalError => 9000,
        }
    }

    /// Check if this error is retryable.
    ///
    /// The pool never retries on its own; this only tells callers whether a
    /// retry with backoff can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted | Self::PoolBusy)
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "sourcing",
            1100..=1199 => "constraint",
            2000..=2099 => "pool",
            5000..=5099 => "configuration",
            5100..=5199 => "serialization",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller input errors (unknown labels, rejected orders)
    Low,
    /// Operational conditions (exhaustion, cancellation)
    Medium,
    /// Misuse of the API or broken configuration
    High,
    /// Internal invariant failures
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::UnknownLabel
            | ErrorCode::UnknownOrder
            | ErrorCode::ConstraintViolation => Self::Low,

            ErrorCode::PoolExhausted
            | ErrorCode::PoolClosed
            | ErrorCode::PoolBusy
            | ErrorCode::FetchCancelled => Self::Medium,

            ErrorCode::UnknownConstraintLabel
            | ErrorCode::InvalidConstraint
            | ErrorCode::ForeignInstance
            | ErrorCode::DoubleRelease
            | ErrorCode::FactoryFailed
            | ErrorCode::ConfigurationError
            | ErrorCode::InvalidConfiguration
            | ErrorCode::MissingConfiguration
            | ErrorCode::SerializationError => Self::High,

            ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured fields attached to an error.
///
/// Each field names the subject of the failure so that logs and callers can
/// match on it without parsing the message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Pool the error was raised by
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,

    /// Offending slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,

    /// Offending label, debug-formatted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Constraint or registered order involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Free-form extra values
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// What the caller can do about it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_pool(pool: impl Into<String>) -> Self {
        Self {
            pool: Some(pool.into()),
            ..Self::default()
        }
    }

    pub fn with_slot(mut self, slot: impl fmt::Display) -> Self {
        self.slot = Some(slot.to_string());
        self
    }

    pub fn with_label(mut self, label: impl fmt::Debug) -> Self {
        self.label = Some(format!("{:?}", label));
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The error type shared by the event sourcer and the object pool.
#[derive(Error, Debug)]
pub struct PatternError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Human-readable message
    message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl PatternError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and message.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self::uncounted(code, message);
        error.record_metrics();
        error
    }

    /// Build an error that `lazy_pattern_errors_total` does not see.
    fn uncounted(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        }
    }

    /// Create an error with both a public and an internal message.
    pub fn with_internal(
        code: ErrorCode,
        message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the error details.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    "Low severity error"
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    fn record_metrics(&self) {
        counter!(
            "lazy_pattern_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
            "retryable" => self.is_retryable().to_string()
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with error code.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| PatternError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| PatternError::new(code, e.to_string()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| PatternError::internal(message.into()))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| PatternError::new(code, "Value not present"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<serde_json::Error> for PatternError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<std::io::Error> for PatternError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, msg) = match error.kind() {
            ErrorKind::NotFound => (ErrorCode::MissingConfiguration, "File not found"),
            ErrorKind::InvalidData => (ErrorCode::SerializationError, "Invalid data"),
            _ => (ErrorCode::InternalError, "An I/O error occurred"),
        };

        Self::with_internal(code, msg, error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for PatternError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<PatternError>() {
            Ok(pattern_error) => pattern_error,
            Err(error) => Self::with_internal(
                ErrorCode::InternalError,
                "An internal error occurred",
                format!("{:#}", error),
            ),
        }
    }
}

impl From<config::ConfigError> for PatternError {
    fn from(error: config::ConfigError) -> Self {
        let (code, msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (ErrorCode::ConfigurationError, "Configuration error occurred"),
        };

        Self::with_internal(code, msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Convenience Constructors for Domain Errors
// ═══════════════════════════════════════════════════════════════════════════════

impl PatternError {
    // ─────────────────────────────────────────────────────────────────────────
    // Sourcing Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// A label was not found in the layer registry.
    pub fn unknown_label(label: impl fmt::Debug) -> Self {
        let details = ErrorDetails::new().with_label(&label);
        Self::new(
            ErrorCode::UnknownLabel,
            format!("Label not found in registry: {:?}", label),
        )
        .with_details(details)
    }

    /// A registered order name was not found.
    pub fn unknown_order(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorCode::UnknownOrder, format!("Order not registered: {}", name))
            .with_details(ErrorDetails::new().with_subject(name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Constraint Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// An order was rejected by a constraint.
    pub fn constraint_violation(constraint: impl Into<String>, order: impl fmt::Debug) -> Self {
        let constraint = constraint.into();
        Self::new(
            ErrorCode::ConstraintViolation,
            format!("Order {:?} rejected by constraint '{}'", order, constraint),
        )
        .with_details(ErrorDetails::new().with_subject(constraint))
    }

    /// A constraint references a label that is not in the registry.
    pub fn unknown_constraint_label(constraint: impl Into<String>, label: impl fmt::Debug) -> Self {
        let constraint = constraint.into();
        let details = ErrorDetails::new()
            .with_subject(constraint.clone())
            .with_label(&label)
            .with_hint("Register the layer before constraining it");
        Self::new(
            ErrorCode::UnknownConstraintLabel,
            format!("Constraint '{}' references unknown label {:?}", constraint, label),
        )
        .with_details(details)
    }

    /// A constraint is malformed.
    pub fn invalid_constraint(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConstraint,
            format!("Invalid constraint: {}", reason.into()),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pool Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// No instance became available within the acquire timeout.
    pub fn pool_exhausted(pool: impl Into<String>, timeout: Duration) -> Self {
        let pool = pool.into();
        let message = format!(
            "Object pool '{}' exhausted: no instance available after {}ms",
            pool,
            timeout.as_millis()
        );
        Self::new(ErrorCode::PoolExhausted, message).with_details(
            ErrorDetails::for_pool(pool)
                .with_context("timeout_ms", timeout.as_millis() as u64)
                .with_hint("Retry with backoff or raise max_live"),
        )
    }

    /// A handle that this pool did not lease was remanded.
    pub fn foreign_instance(pool: impl Into<String>, slot: impl fmt::Display) -> Self {
        let pool = pool.into();
        let message = format!("Instance {} was not leased from pool '{}'", slot, pool);
        Self::new(ErrorCode::ForeignInstance, message)
            .with_details(ErrorDetails::for_pool(pool).with_slot(slot))
    }

    /// A slot that is already free was remanded.
    pub fn double_release(pool: impl Into<String>, slot: impl fmt::Display) -> Self {
        let pool = pool.into();
        let message = format!("Instance {} was already returned to pool '{}'", slot, pool);
        Self::new(ErrorCode::DoubleRelease, message)
            .with_details(ErrorDetails::for_pool(pool).with_slot(slot))
    }

    /// The factory failed to construct an instance.
    pub fn factory_failed(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        let pool = pool.into();
        let message = format!("Factory for pool '{}' failed: {}", pool, reason.into());
        Self::new(ErrorCode::FactoryFailed, message).with_details(ErrorDetails::for_pool(pool))
    }

    /// Wrap an error returned by a factory.
    ///
    /// The cause was counted when it was created, so the wrapper is not.
    pub fn factory_failed_by(pool: impl Into<String>, cause: PatternError) -> Self {
        let pool = pool.into();
        let message = format!("Factory for pool '{}' failed: {}", pool, cause.message());
        Self::uncounted(ErrorCode::FactoryFailed, message)
            .with_details(ErrorDetails::for_pool(pool))
            .with_internal_message(format!("cause code: {}", cause.code()))
            .with_source(cause)
    }

    /// The pool has been closed.
    pub fn pool_closed(pool: impl Into<String>) -> Self {
        let pool = pool.into();
        Self::new(ErrorCode::PoolClosed, format!("Object pool '{}' is closed", pool))
            .with_details(ErrorDetails::for_pool(pool))
    }

    /// The pool cannot be closed while instances are outstanding.
    pub fn pool_busy(pool: impl Into<String>, outstanding: usize) -> Self {
        let pool = pool.into();
        let message = format!(
            "Object pool '{}' has {} outstanding instance(s)",
            pool, outstanding
        );
        Self::new(ErrorCode::PoolBusy, message).with_details(
            ErrorDetails::for_pool(pool)
                .with_context("outstanding", outstanding)
                .with_hint("Remand every lease before closing"),
        )
    }

    /// A suspended fetch was cancelled.
    pub fn fetch_cancelled(pool: impl Into<String>) -> Self {
        let pool = pool.into();
        let message = format!("Fetch from object pool '{}' was cancelled", pool);
        Self::new(ErrorCode::FetchCancelled, message).with_details(ErrorDetails::for_pool(pool))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::UnknownLabel.numeric_code(), 1000);
        assert_eq!(ErrorCode::ConstraintViolation.numeric_code(), 1100);
        assert_eq!(ErrorCode::PoolExhausted.numeric_code(), 2000);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 9000);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UnknownOrder.category(), "sourcing");
        assert_eq!(ErrorCode::InvalidConstraint.category(), "constraint");
        assert_eq!(ErrorCode::DoubleRelease.category(), "pool");
        assert_eq!(ErrorCode::MissingConfiguration.category(), "configuration");
        assert_eq!(ErrorCode::SerializationError.category(), "serialization");
    }

    #[test]
    fn test_error_code_is_retryable() {
        assert!(ErrorCode::PoolExhausted.is_retryable());
        assert!(ErrorCode::PoolBusy.is_retryable());
        assert!(!ErrorCode::UnknownLabel.is_retryable());
        assert!(!ErrorCode::ForeignInstance.is_retryable());
        assert!(!ErrorCode::DoubleRelease.is_retryable());
    }

    #[test]
    fn test_unknown_label_error() {
        let error = PatternError::unknown_label("LATTE");
        assert_eq!(error.code(), ErrorCode::UnknownLabel);
        assert_eq!(error.details().label.as_deref(), Some("\"LATTE\""));
        assert!(error.message().contains("LATTE"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_pool_exhausted_error() {
        let error = PatternError::pool_exhausted("splitters", Duration::from_millis(250));
        assert_eq!(error.code(), ErrorCode::PoolExhausted);
        assert!(error.is_retryable());
        assert_eq!(error.details().pool.as_deref(), Some("splitters"));
        assert_eq!(
            error.details().context.get("timeout_ms"),
            Some(&serde_json::json!(250))
        );
        assert!(error.details().hint.is_some());
    }

    #[test]
    fn test_factory_failed_by_wraps_cause() {
        let cause = PatternError::internal("disk full");
        let error = PatternError::factory_failed_by("splitters", cause);

        assert_eq!(error.code(), ErrorCode::FactoryFailed);
        assert!(error.message().contains("splitters"));
        assert!(error.message().contains("An internal error occurred"));
        assert_eq!(error.internal_message(), Some("cause code: InternalError"));
        assert_eq!(error.details().pool.as_deref(), Some("splitters"));

        let source = std::error::Error::source(&error).unwrap();
        assert!(source.to_string().contains("disk full"));
    }

    #[test]
    fn test_unknown_constraint_label_keeps_context() {
        let error = PatternError::unknown_constraint_label("sizes", "VENTI");
        assert_eq!(error.code(), ErrorCode::UnknownConstraintLabel);
        assert_eq!(error.details().subject.as_deref(), Some("sizes"));
        assert_eq!(error.details().label.as_deref(), Some("\"VENTI\""));
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::UnknownLabel),
            ErrorSeverity::Low
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::PoolExhausted),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::DoubleRelease),
            ErrorSeverity::High
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::InternalError),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn test_error_context_on_result() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk on fire",
        ));
        let error = result.context("Failed to read registry").unwrap_err();
        assert_eq!(error.code(), ErrorCode::InternalError);
        assert_eq!(error.internal_message(), Some("Failed to read registry"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_error_context_on_option() {
        let missing: Option<u32> = None;
        let error = missing.with_error_code(ErrorCode::UnknownOrder).unwrap_err();
        assert_eq!(error.code(), ErrorCode::UnknownOrder);
    }

    #[test]
    fn test_from_anyhow_preserves_pattern_error() {
        let original = PatternError::pool_closed("p");
        let wrapped: anyhow::Error = original.into();
        let back: PatternError = wrapped.into();
        assert_eq!(back.code(), ErrorCode::PoolClosed);
    }

    #[test]
    fn test_error_display() {
        let error = PatternError::with_internal(
            ErrorCode::FactoryFailed,
            "Factory failed",
            "socket refused",
        );

        let display = format!("{}", error);
        assert!(display.contains("FactoryFailed"));
        assert!(display.contains("Factory failed"));
        assert!(display.contains("socket refused"));
    }

    #[test]
    fn test_error_serialization_of_details() {
        let details = ErrorDetails::for_pool("parsers")
            .with_slot("abc")
            .with_context("outstanding", 3)
            .with_hint("wait");
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["pool"], "parsers");
        assert_eq!(json["slot"], "abc");
        assert_eq!(json["context"]["outstanding"], 3);
        assert!(json.get("label").is_none());
    }
}
