//! Raw token amounts as 256-bit unsigned integers
//!
//! Amounts travel through the engine as `U256` so raw token units are never
//! rounded through floating point. On the wire they are decimal strings.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Amount as it arrives from an upstream parser.
///
/// Parsers disagree on the encoding: some emit decimal strings, some JSON
/// integers, a few emit floats. All three are accepted and coerced.
///
/// A bare JSON integer above `u64::MAX` is parsed by serde_json as a float
/// and has already lost digits, so floats are only trusted below 2^53.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Unsigned(u64),
    Text(String),
    Float(f64),
}

// 2^53, the first integer an f64 cannot tell apart from its neighbour
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl RawAmount {
    /// Coerce to `U256`. Negative, non-finite and non-numeric values are rejected,
    /// as are floats too large to hold an exact integer.
    ///
    /// Fractional parts are truncated; raw units are integral by definition.
    pub fn to_u256(&self) -> Option<U256> {
        match self {
            RawAmount::Unsigned(value) => Some(U256::from(*value)),
            RawAmount::Text(text) => parse_decimal(text),
            RawAmount::Float(value) => {
                if value.is_finite() && *value >= 0.0 && *value < MAX_EXACT_FLOAT {
                    Some(U256::from(value.trunc() as u64))
                } else {
                    None
                }
            }
        }
    }
}

fn parse_decimal(text: &str) -> Option<U256> {
    let text = text.trim();
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (text, ""),
    };

    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    if integer.is_empty() {
        return if fraction.is_empty() { None } else { Some(U256::ZERO) };
    }

    if !integer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    U256::from_str_radix(integer, 10).ok()
}

/// Lossy conversion for ratio and price arithmetic.
pub fn to_f64(value: &U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}

/// Overflow-safe sum of raw amounts.
pub fn sum<'a, I>(values: I) -> U256
where
    I: IntoIterator<Item = &'a U256>,
{
    values
        .into_iter()
        .fold(U256::ZERO, |acc, value| acc.saturating_add(*value))
}

/// `serde(with = ...)` adapter that writes `U256` as a decimal string.
pub mod decimal {
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        U256::from_str_radix(text.trim(), 10).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_decimal_string() {
        let amount = RawAmount::Text("123456789012345678901234567890".to_string());
        let value = amount.to_u256().unwrap();
        assert_eq!(value.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn test_coerce_truncates_fraction() {
        assert_eq!(
            RawAmount::Text("42.999".to_string()).to_u256(),
            Some(U256::from(42u64))
        );
        assert_eq!(RawAmount::Float(7.9).to_u256(), Some(U256::from(7u64)));
        assert_eq!(RawAmount::Text(".5".to_string()).to_u256(), Some(U256::ZERO));
    }

    #[test]
    fn test_rejects_negative_and_garbage() {
        assert_eq!(RawAmount::Text("-5".to_string()).to_u256(), None);
        assert_eq!(RawAmount::Text("12abc".to_string()).to_u256(), None);
        assert_eq!(RawAmount::Text("".to_string()).to_u256(), None);
        assert_eq!(RawAmount::Float(-1.0).to_u256(), None);
        assert_eq!(RawAmount::Float(f64::NAN).to_u256(), None);
    }

    #[test]
    fn test_rejects_floats_beyond_exact_range() {
        assert_eq!(
            RawAmount::Float(9_007_199_254_740_991.0).to_u256(),
            Some(U256::from(9_007_199_254_740_991u64))
        );
        assert_eq!(RawAmount::Float(9_007_199_254_740_992.0).to_u256(), None);
        assert_eq!(RawAmount::Float(1e300).to_u256(), None);
    }

    #[test]
    fn test_large_bare_integer_is_not_rounded() {
        // Above u64::MAX serde_json falls back to f64
        let amount: RawAmount = serde_json::from_str("123456789012345678901234567890").unwrap();
        assert_eq!(amount.to_u256(), None);

        let max: RawAmount = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(max.to_u256(), Some(U256::from(u64::MAX)));
    }

    #[test]
    fn test_untagged_json_forms() {
        let from_int: RawAmount = serde_json::from_str("1500").unwrap();
        let from_str: RawAmount = serde_json::from_str("\"1500\"").unwrap();
        assert_eq!(from_int.to_u256(), from_str.to_u256());
    }

    #[test]
    fn test_decimal_serde_preserves_precision() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Holder {
            #[serde(with = "decimal")]
            amount: U256,
        }

        let big = U256::from(u128::MAX).saturating_add(U256::from(99u64));
        let json = serde_json::to_string(&Holder { amount: big }).unwrap();
        assert_eq!(json, format!("{{\"amount\":\"{}\"}}", big));

        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, big);
    }

    #[test]
    fn test_sum_and_lossy_float() {
        let values = vec![U256::from(10u64), U256::from(32u64)];
        assert_eq!(sum(&values), U256::from(42u64));
        assert_eq!(to_f64(&U256::from(1_000_000u64)), 1_000_000.0);
    }
}
