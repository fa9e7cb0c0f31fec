use serde_json::{Map, Value};

/// Argument bag that has passed shape validation.
///
/// Only [`ObjectShape::validate_arguments`](crate::ObjectShape::validate_arguments)
/// constructs this type, so holding one means every declared field that is
/// present matches its shape and every required field is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    fields: Map<String, Value>,
}

/// Access error for a field a handler expected but did not find.
///
/// Validation makes these unreachable for declared required fields; they
/// surface when a handler asks for something its shape does not require.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("missing required argument `{name}`")]
    Missing { name: String },
    #[error("argument `{name}` must be {expected}")]
    WrongType {
        name: String,
        expected: &'static str,
    },
}

impl Arguments {
    pub(crate) fn from_validated(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// # Errors
    ///
    /// Returns [`ArgumentError`] if the field is absent or not a string.
    pub fn require_str(&self, name: &str) -> Result<&str, ArgumentError> {
        match self.fields.get(name) {
            None => Err(ArgumentError::Missing {
                name: name.to_string(),
            }),
            Some(value) => value.as_str().ok_or_else(|| ArgumentError::WrongType {
                name: name.to_string(),
                expected: "a string",
            }),
        }
    }

    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn u64(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(Value::as_u64)
    }

    /// Removes and returns a field.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Removes and returns a field that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Missing`] if the field is absent.
    pub fn require(&mut self, name: &str) -> Result<Value, ArgumentError> {
        self.take(name).ok_or_else(|| ArgumentError::Missing {
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}
