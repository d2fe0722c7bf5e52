use serde_json::Value;

use super::errors::{TranslationError, TranslationResult};

/// Converts a caller-supplied parameter value into a representation that can be bound
/// by the database driver. Invoked once per distinct parameter.
pub trait ParameterNegotiator {
    fn negotiate(&self, symbol: &str, value: &Value) -> TranslationResult<Value>;
}

/// Passes JSON values through, rejecting integers that do not fit a signed 64 bit column
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParameterNegotiator;

impl ParameterNegotiator for JsonParameterNegotiator {
    fn negotiate(&self, symbol: &str, value: &Value) -> TranslationResult<Value> {
        check_value(symbol, value)?;
        Ok(value.clone())
    }
}

fn check_value(symbol: &str, value: &Value) -> TranslationResult<()> {
    match value {
        Value::Number(number) if number.is_u64() && number.as_i64().is_none() => {
            Err(TranslationError::incompatible(format!(
                "parameter {symbol}: unsigned 64 bit integer values are not supported"
            )))
        }
        Value::Array(values) => values.iter().try_for_each(|value| check_value(symbol, value)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passthrough() {
        let negotiator = JsonParameterNegotiator;

        assert_eq!(negotiator.negotiate("p", &json!("a")), Ok(json!("a")));
        assert_eq!(negotiator.negotiate("p", &json!([1, 2])), Ok(json!([1, 2])));
    }

    #[test]
    fn test_rejects_unsigned_overflow() {
        let negotiator = JsonParameterNegotiator;

        assert!(negotiator.negotiate("p", &json!(u64::MAX)).is_err());
        assert!(negotiator.negotiate("p", &json!([1, u64::MAX])).is_err());
    }
}
