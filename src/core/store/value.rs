use serde::{Deserialize, Serialize};

/// A value held by the settings store.
///
/// Values are tagged on disk so a reader never has to guess whether `"1"` was
/// meant as text or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoreValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl StoreValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoreValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Decode a structured value. Anything that is not `Json` or does not
    /// match `T` decodes to `None`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        match self {
            StoreValue::Json(value) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(StoreValue::Json)
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        StoreValue::Text(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_form_is_tagged() {
        let json = serde_json::to_string(&StoreValue::Text("vulkan".into())).unwrap();
        assert_eq!(json, r#"{"kind":"text","value":"vulkan"}"#);
    }

    #[test]
    fn decode_rejects_mismatched_kind() {
        let value = StoreValue::Text("[1,2]".into());
        assert_eq!(value.decode::<Vec<u32>>(), None);

        let value = StoreValue::encode(&vec![1u32, 2]).unwrap();
        assert_eq!(value.decode::<Vec<u32>>(), Some(vec![1, 2]));
    }
}
