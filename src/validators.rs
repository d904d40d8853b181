//! Value validators
//!
//! A validator inspects a single (already transformed) leaf value and either
//! accepts it with `Ok(())` or rejects it with a human readable reason. The
//! loader attaches the attribute path to the reason, so messages here only
//! describe the value itself.
//!
//! Any closure `Fn(&Value) -> Result<(), String>` is a validator:
//!
//! ```
//! use classconfig::validators::{AllValidator, IntegerValidator, Validator};
//! use serde_json::{json, Value};
//!
//! let even = |v: &Value| match v.as_i64() {
//!     Some(n) if n % 2 == 0 => Ok(()),
//!     _ => Err("Value must be an even integer".to_string()),
//! };
//! let validator = AllValidator::new().with(IntegerValidator).with(even);
//!
//! assert!(validator.validate(&json!(4)).is_ok());
//! assert!(validator.validate(&json!(3)).is_err());
//! ```

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Validation capability for a single value
pub trait Validator: Send + Sync {
    /// Accept the value or explain why it is rejected
    fn validate(&self, value: &Value) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<(), String> {
        self(value)
    }
}

// =============================================================================
// Value Kinds
// =============================================================================

/// Shape of a data tree node, used by type validators and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// Kind of the given value. Numbers without a fraction part are integers.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Sequence,
            Value::Object(_) => ValueKind::Mapping,
        }
    }

    /// Whether a value of kind `actual` satisfies this kind.
    ///
    /// Integers satisfy `Float`.
    #[must_use]
    pub fn accepts(self, actual: ValueKind) -> bool {
        self == actual || (self == ValueKind::Float && actual == ValueKind::Integer)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Sequence => "sequence",
            ValueKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

fn expect_kind(expected: ValueKind, value: &Value) -> Result<(), String> {
    let actual = ValueKind::of(value);
    if expected.accepts(actual) {
        Ok(())
    } else {
        Err(format!("Value must be of type {expected}, got {actual}"))
    }
}

// =============================================================================
// Type Validators
// =============================================================================

/// Accepts any value of the given kind
#[derive(Debug, Clone, Copy)]
pub struct TypeValidator(pub ValueKind);

impl Validator for TypeValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        expect_kind(self.0, value)
    }
}

/// Accepts integers only (`5`, not `5.0` or `"5"`)
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerValidator;

impl Validator for IntegerValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        expect_kind(ValueKind::Integer, value)
    }
}

/// Accepts any number
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatValidator;

impl Validator for FloatValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        expect_kind(ValueKind::Float, value)
    }
}

/// Accepts strings only
#[derive(Debug, Clone, Copy, Default)]
pub struct StringValidator;

impl Validator for StringValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        expect_kind(ValueKind::String, value)
    }
}

/// Accepts booleans only
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolValidator;

impl Validator for BoolValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        expect_kind(ValueKind::Bool, value)
    }
}

/// Accepts only `null`; combine with [`AnyValidator`] for optional values
#[derive(Debug, Clone, Copy, Default)]
pub struct IsNoneValidator;

impl Validator for IsNoneValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        expect_kind(ValueKind::Null, value)
    }
}

/// Accepts a sequence whose items all have the given kind
#[derive(Debug, Clone, Copy)]
pub struct ListOfTypesValidator {
    kind: ValueKind,
    allow_empty: bool,
}

impl ListOfTypesValidator {
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            allow_empty: true,
        }
    }

    /// Reject empty sequences
    #[must_use]
    pub fn non_empty(mut self) -> Self {
        self.allow_empty = false;
        self
    }
}

impl Validator for ListOfTypesValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let items = value
            .as_array()
            .ok_or_else(|| format!("Value must be a sequence, got {}", ValueKind::of(value)))?;

        if items.is_empty() && !self.allow_empty {
            return Err("Sequence must not be empty".to_string());
        }

        for (i, item) in items.iter().enumerate() {
            expect_kind(self.kind, item).map_err(|e| format!("Item {i}: {e}"))?;
        }
        Ok(())
    }
}

// =============================================================================
// Range Validators
// =============================================================================

/// Accepts integers greater than or equal to the minimum
#[derive(Debug, Clone, Copy)]
pub struct MinValueIntegerValidator(pub i64);

impl Validator for MinValueIntegerValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let num = value
            .as_i64()
            .ok_or_else(|| format!("Value must be an integer, got {}", ValueKind::of(value)))?;
        if num < self.0 {
            return Err(format!("Value must be at least {}, got {num}", self.0));
        }
        Ok(())
    }
}

/// Accepts numbers greater than or equal to the minimum
#[derive(Debug, Clone, Copy)]
pub struct MinValueFloatValidator(pub f64);

impl Validator for MinValueFloatValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let num = value
            .as_f64()
            .ok_or_else(|| format!("Value must be a number, got {}", ValueKind::of(value)))?;
        if num < self.0 {
            return Err(format!("Value must be at least {}, got {num}", self.0));
        }
        Ok(())
    }
}

/// Accepts integers inside the inclusive interval `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct ValueInIntervalIntegerValidator {
    pub min: i64,
    pub max: i64,
}

impl ValueInIntervalIntegerValidator {
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl Validator for ValueInIntervalIntegerValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let num = value
            .as_i64()
            .ok_or_else(|| format!("Value must be an integer, got {}", ValueKind::of(value)))?;
        if num < self.min || num > self.max {
            return Err(format!(
                "Value must be in interval [{}, {}], got {num}",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Accepts numbers inside the inclusive interval `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct ValueInIntervalFloatValidator {
    pub min: f64,
    pub max: f64,
}

impl ValueInIntervalFloatValidator {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Validator for ValueInIntervalFloatValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let num = value
            .as_f64()
            .ok_or_else(|| format!("Value must be a number, got {}", ValueKind::of(value)))?;
        if num < self.min || num > self.max {
            return Err(format!(
                "Value must be in interval [{}, {}], got {num}",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Accepts strings matching a regular expression
#[derive(Debug, Clone)]
pub struct PatternValidator {
    regex: Regex,
}

impl PatternValidator {
    /// Compile the pattern
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error message if the pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("Pattern cannot be empty string".to_string());
        }
        let regex = Regex::new(pattern).map_err(|e| format!("Invalid regex pattern: {e}"))?;
        Ok(Self { regex })
    }
}

impl Validator for PatternValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let text = value
            .as_str()
            .ok_or_else(|| format!("Value must be a string, got {}", ValueKind::of(value)))?;
        if !self.regex.is_match(text) {
            return Err(format!(
                "Value does not match pattern: {}",
                self.regex.as_str()
            ));
        }
        Ok(())
    }
}

/// Accepts strings naming an existing file system path
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePathValidator;

impl Validator for FilePathValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let path = value
            .as_str()
            .ok_or_else(|| format!("Value must be a path string, got {}", ValueKind::of(value)))?;
        if !Path::new(path).exists() {
            return Err(format!("Path '{path}' does not exist"));
        }
        Ok(())
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// Succeeds iff every sub-validator succeeds.
///
/// Stops at the first failure and returns its reason unchanged.
#[derive(Clone, Default)]
pub struct AllValidator {
    validators: Vec<Arc<dyn Validator>>,
}

impl AllValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }
}

impl Validator for AllValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        for validator in &self.validators {
            validator.validate(value)?;
        }
        Ok(())
    }
}

/// Succeeds iff at least one sub-validator succeeds.
///
/// Stops at the first success. When every alternative fails, the error lists
/// all of their reasons in declaration order.
#[derive(Clone, Default)]
pub struct AnyValidator {
    validators: Vec<Arc<dyn Validator>>,
}

impl AnyValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }
}

impl Validator for AnyValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let mut reasons = Vec::with_capacity(self.validators.len());
        for validator in &self.validators {
            match validator.validate(value) {
                Ok(()) => return Ok(()),
                Err(reason) => reasons.push(reason),
            }
        }
        if reasons.is_empty() {
            return Err("No alternatives to validate against".to_string());
        }
        Err(format!(
            "No alternative accepted the value: {}",
            reasons
                .iter()
                .enumerate()
                .map(|(i, r)| format!("({}) {r}", i + 1))
                .collect::<Vec<_>>()
                .join("; ")
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
