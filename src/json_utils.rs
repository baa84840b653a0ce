/// The API transmits every `int64` as a JSON string (`"totalTokens": "42"`). These helpers accept
/// either a string or a number when decoding and always write strings back.
pub mod stringified_u64 {
    use serde::{self, Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.trim().parse::<u64>().map_err(|_| {
                de::Error::custom(format!("expected a non-negative integer, got {s:?}"))
            }),
            StringOrNumber::Number(n) => n.as_u64().ok_or_else(|| {
                de::Error::custom(format!("expected a non-negative integer, got {n}"))
            }),
        }
    }

    /// Same as the parent module, for optional fields.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super")] u64);

            Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(v)| v))
        }
    }
}
