//! Configuration validation utilities

use crate::HelmError;
use std::fmt;

/// Configuration validation result
pub type ValidationResult = Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value is required but missing
    Required { field: String },
    /// Value is out of acceptable range
    OutOfRange {
        field: String,
        min: Option<u64>,
        max: Option<u64>,
        actual: u64,
    },
    /// Custom validation failed
    Custom { field: String, message: String },
    /// Several fields failed at once
    Multiple(Vec<ValidationError>),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required { field } => {
                write!(f, "Field '{field}' is required but missing")
            }
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
            ValidationError::Multiple(errors) => {
                let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join("; "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for HelmError {
    fn from(err: ValidationError) -> Self {
        HelmError::config(err.to_string())
    }
}

/// Configuration validator that accumulates validation failures
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator for a nested section
    pub fn for_field(&self, field_name: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: self.full_field_name(field_name),
        }
    }

    /// Validate that a value is present
    pub fn required<T>(&mut self, field_name: &str, value: &Option<T>) -> &mut Self {
        if value.is_none() {
            self.errors.push(ValidationError::Required {
                field: self.full_field_name(field_name),
            });
        }
        self
    }

    /// Validate that a number is within range
    pub fn range(
        &mut self,
        field_name: &str,
        value: u64,
        min: Option<u64>,
        max: Option<u64>,
    ) -> &mut Self {
        let below = min.is_some_and(|min| value < min);
        let above = max.is_some_and(|max| value > max);
        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min,
                max,
                actual: value,
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom<T, F>(&mut self, field_name: &str, value: &T, predicate: F, message: &str) -> &mut Self
    where
        F: FnOnce(&T) -> bool,
    {
        if !predicate(value) {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.to_string(),
            });
        }
        self
    }

    /// Merge errors from a nested validator
    pub fn merge(&mut self, other: ConfigValidator) {
        self.errors.extend(other.errors);
    }

    /// Finish validation, reporting every accumulated failure
    pub fn result(mut self) -> ValidationResult {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}
