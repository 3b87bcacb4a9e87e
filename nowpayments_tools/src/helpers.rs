use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use vpg_common::Amount;

/// NOWPayments wants amounts as JSON numbers.
pub fn amount_as_number<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
where S: Serializer {
    let n = Number::from_str(&amount.to_string()).map_err(serde::ser::Error::custom)?;
    n.serialize(serializer)
}

/// Ids come back as strings on some endpoints and as numbers on others.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("Expected a string or a number, got {other}"))),
    }
}

/// Amounts come back as strings or numbers.
pub fn amount_from_any<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where D: Deserializer<'de> {
    string_or_number(deserializer)?.parse::<Amount>().map_err(de::Error::custom)
}
