use serde::{de, Deserialize, Deserializer, Serialize};

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(deserialize_with = "integer_like")]
    pub user_id: i64, // users.id at issuance
    pub exp: i64,     // expires at (unix timestamp)
}

// Accepts `7` and `7.0`. Other clients may encode numbers as floats.
fn integer_like<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(v) => Ok(v),
        Number::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        Number::Float(v) => Err(de::Error::custom(format!("user_id {v} is not an integer"))),
    }
}
