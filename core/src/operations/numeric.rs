//! Number parsing and rendering shared by filters and aggregates.
//!
//! Record fields are text; operations that need numbers parse on demand and
//! render results back to text with the helpers here so that every site
//! formats numbers the same way.

use crate::rdd::{Field, Record};
use crate::traits::{EngineError, EngineResult};

/// Parse a field as a floating point number.
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Parse a field as a 64-bit integer.
pub fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Render a float without a trailing `.0` for integral values.
pub fn format_float(value: f64) -> String {
    value.to_string()
}

/// Float addition of two textual operands.
pub fn add_float(left: &str, right: &str) -> EngineResult<String> {
    let sum = float_operand(left)? + float_operand(right)?;
    Ok(format_float(sum))
}

/// Integer addition of two textual operands, failing on overflow.
pub fn add_integer(left: &str, right: &str) -> EngineResult<String> {
    let (left, right) = (integer_operand(left)?, integer_operand(right)?);
    left.checked_add(right)
        .map(|sum| sum.to_string())
        .ok_or_else(|| EngineError::Validation(format!("integer overflow adding {left} and {right}")))
}

pub fn float_operand(text: &str) -> EngineResult<f64> {
    parse_float(text).ok_or_else(|| not_a_number(text))
}

pub fn integer_operand(text: &str) -> EngineResult<i64> {
    parse_integer(text).ok_or_else(|| EngineError::Validation(format!("'{text}' is not an integer")))
}

fn not_a_number(text: &str) -> EngineError {
    EngineError::Validation(format!("'{text}' is not a number"))
}

/// Check that `field` of every record is present and numeric.
pub fn ensure_numeric<'a>(
    records: impl Iterator<Item = &'a Record>,
    field: Field,
    integer: bool,
) -> EngineResult<()> {
    for record in records {
        let Some(text) = record.field(field) else {
            return Err(EngineError::Validation(format!(
                "record {record} has no {field} to aggregate"
            )));
        };
        let numeric = if integer {
            parse_integer(text).is_some()
        } else {
            parse_float(text).is_some()
        };
        if !numeric {
            return Err(EngineError::Validation(format!(
                "values must be numbers: {field} of record {record} is '{text}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(4.0), "4");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(-0.25), "-0.25");
    }

    #[test]
    fn test_add() {
        assert_eq!(add_float("1", "3").unwrap(), "4");
        assert_eq!(add_float("1.5", " 2 ").unwrap(), "3.5");
        assert!(add_float("x", "1").unwrap_err().is_validation());

        assert_eq!(add_integer("40", "2").unwrap(), "42");
        assert!(add_integer(&i64::MAX.to_string(), "1").unwrap_err().is_validation());
        assert!(add_integer("1.5", "1").is_err());
    }

    #[test]
    fn test_ensure_numeric() {
        let records = [Record::pair("a", "1"), Record::pair("b", "2.5")];
        assert!(ensure_numeric(records.iter(), Field::Value, false).is_ok());
        assert!(ensure_numeric(records.iter(), Field::Value, true).is_err());
        assert!(ensure_numeric(records.iter(), Field::Key, false).is_err());

        let keyless = [Record::value_only("3")];
        let err = ensure_numeric(keyless.iter(), Field::Key, false).unwrap_err();
        assert!(err.is_validation());
    }
}
