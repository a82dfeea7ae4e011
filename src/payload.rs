//! The data shared between procedures during one pipeline run.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::Error;

/// An insertion-ordered mapping of field names to JSON values.
///
/// A payload only ever grows while a pipeline runs: each procedure's partial
/// payload is [`merge`](Payload::merge)d in, later keys overwriting earlier
/// ones with the same name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Adds a field and returns `self` for chaining.
    ///
    /// ```rust
    /// use verdict::Payload;
    ///
    /// let payload = Payload::new().with("a", 1).with("b", "two");
    /// assert_eq!(payload.len(), 2);
    /// ```
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    /// Serialises `value` and stores it under `key`.
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), Error> {
        let value = serde_json::to_value(value).map_err(|source| Error::Payload {
            key: key.to_owned(),
            source,
        })?;
        self.0.insert(key.to_owned(), value);
        Ok(())
    }

    /// Raw access to a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserialises the field stored under `key`.
    ///
    /// Returns `Ok(None)` when the field is absent and an error when it is
    /// present but has the wrong shape.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.0
            .get(key)
            .map(|value| {
                T::deserialize(value).map_err(|source| Error::Payload {
                    key: key.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merges `other` into `self`. Keys already present are overwritten.
    pub fn merge(&mut self, other: Payload) {
        self.0.extend(other.0);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn merge_overwrites_and_keeps_order() {
        let mut payload = Payload::new().with("a", 1).with("b", 2);
        payload.merge(Payload::new().with("c", 3).with("a", 10));

        assert_eq!(payload.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(payload.get("a"), Some(&json!(10)));
    }

    #[test]
    fn field_distinguishes_missing_from_malformed() {
        let payload = Payload::new().with("id", "not a number");

        assert!(matches!(payload.field::<u64>("missing"), Ok(None)));
        assert!(matches!(payload.field::<u64>("id"), Err(Error::Payload { .. })));
        assert_eq!(payload.field::<String>("id").ok().flatten().as_deref(), Some("not a number"));
    }
}
