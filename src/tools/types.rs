//! Shared action argument helpers.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Arguments for actions that take none
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmptyArgs {}

/// Models send ids and prices either as strings or as bare numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// Accept `"12"` or `12` for a string field
pub(crate) fn stringly<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(Into::into)
}

pub(crate) fn stringly_opt<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Args {
        #[serde(deserialize_with = "stringly")]
        market_id: String,
        #[serde(default, deserialize_with = "stringly_opt")]
        entrance_fee: Option<String>,
    }

    #[test]
    fn numbers_become_strings() {
        let args: Args = serde_json::from_value(json!({"marketId": 7, "entranceFee": 0.002})).unwrap();
        assert_eq!(args.market_id, "7");
        assert_eq!(args.entrance_fee.as_deref(), Some("0.002"));
    }

    #[test]
    fn optional_field_may_be_missing_or_null() {
        let args: Args = serde_json::from_value(json!({"marketId": "3"})).unwrap();
        assert_eq!(args.entrance_fee, None);
        let args: Args = serde_json::from_value(json!({"marketId": "3", "entranceFee": null})).unwrap();
        assert_eq!(args.entrance_fee, None);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(serde_json::from_value::<Args>(json!({"marketId": [1]})).is_err());
    }
}
