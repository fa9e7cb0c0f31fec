//! Declarative input shapes and the recursive validator that interprets them.
//!
//! Every operation declares its input as a [`ObjectShape`]. A single generic
//! validator walks the shape and the caller's untyped JSON side by side and
//! stops at the first structural mismatch, so new operations only declare
//! data and never add predicate code.
//!
//! Validation is permissive about undeclared object fields: they are
//! accepted and carried through untouched.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::args::Arguments;

// ---------------------------------------------------------------------------
// Shape vocabulary
// ---------------------------------------------------------------------------

/// Scalar JSON types a value can be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Number,
    /// A JSON number without a fractional part.
    Integer,
    Boolean,
}

impl Primitive {
    /// JSON-Schema `type` keyword for this primitive.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Structural type descriptor for runtime validation of untyped input.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Accepts any value. Used for opaque upstream documents.
    Any,
    Primitive(Primitive),
    Object(ObjectShape),
    /// Every element must match the element shape.
    Array(Box<Shape>),
    /// The value must equal one of the listed literals.
    Enum(Vec<Value>),
}

impl Shape {
    #[must_use]
    pub const fn string() -> Self {
        Self::Primitive(Primitive::String)
    }

    #[must_use]
    pub const fn number() -> Self {
        Self::Primitive(Primitive::Number)
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::Primitive(Primitive::Integer)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::Primitive(Primitive::Boolean)
    }

    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    #[must_use]
    pub fn array(items: impl Into<Shape>) -> Self {
        Self::Array(Box::new(items.into()))
    }

    /// Enum of literal values, e.g. `Shape::one_of(["asc", "desc"])`.
    #[must_use]
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Validates `value` against this shape, reporting the first mismatch.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending path and the shape
    /// that was expected there.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.check(value, &mut Vec::new())
    }

    /// Predicate form of [`Shape::validate`].
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    /// Short human-readable description used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any value".to_string(),
            Self::Primitive(p) => p.as_str().to_string(),
            Self::Object(_) => "object".to_string(),
            Self::Array(items) => format!("array of {}", items.describe()),
            Self::Enum(values) => format!("one of {}", render_literals(values)),
        }
    }

    /// Renders the shape as a JSON Schema fragment for the advertised catalog.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Any => json!({}),
            Self::Primitive(p) => json!({ "type": p.as_str() }),
            Self::Object(object) => object.to_json_schema(),
            Self::Array(items) => json!({ "type": "array", "items": items.to_json_schema() }),
            Self::Enum(values) => {
                if values.iter().all(Value::is_string) {
                    json!({ "type": "string", "enum": values })
                } else {
                    json!({ "enum": values })
                }
            }
        }
    }

    fn check<'s>(
        &'s self,
        value: &Value,
        path: &mut Vec<PathSegment<'s>>,
    ) -> Result<(), ValidationError> {
        match self {
            Self::Any => Ok(()),
            Self::Primitive(p) => {
                if p.accepts(value) {
                    Ok(())
                } else {
                    Err(ValidationError::mismatch(path, self, value))
                }
            }
            Self::Enum(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(ValidationError {
                        path: render_path(path),
                        problem: Problem::NotInEnum {
                            allowed: render_literals(allowed),
                            found: value.to_string(),
                        },
                    })
                }
            }
            Self::Array(items) => {
                let Value::Array(elements) = value else {
                    return Err(ValidationError::mismatch(path, self, value));
                };
                for (index, element) in elements.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    items.check(element, path)?;
                    path.pop();
                }
                Ok(())
            }
            Self::Object(object) => {
                let Value::Object(map) = value else {
                    return Err(ValidationError::mismatch(path, self, value));
                };
                object.check_fields(map, path)
            }
        }
    }

    /// Drops `null` optional fields from declared objects, recursively.
    fn prune(&self, value: &mut Value) {
        match (self, value) {
            (Self::Object(object), Value::Object(map)) => object.prune(map),
            (Self::Array(items), Value::Array(elements)) => {
                for element in elements {
                    items.prune(element);
                }
            }
            _ => {}
        }
    }
}

impl From<Primitive> for Shape {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

impl From<ObjectShape> for Shape {
    fn from(object: ObjectShape) -> Self {
        Self::Object(object)
    }
}

impl Serialize for Shape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// A single named field of an [`ObjectShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: Shape,
    pub required: bool,
    pub description: Option<String>,
}

/// Object shape: an ordered list of independently required/optional fields.
///
/// Field order is significant. It is the order fields are checked in (and
/// therefore which mismatch is reported first) and the order properties
/// appear in the rendered JSON Schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    fields: Vec<Field>,
}

impl ObjectShape {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field that must be present and non-null.
    #[must_use]
    pub fn required(self, name: &str, shape: impl Into<Shape>, description: &str) -> Self {
        self.with_field(name, shape.into(), true, description)
    }

    /// Adds a field that may be absent or `null`.
    #[must_use]
    pub fn optional(self, name: &str, shape: impl Into<Shape>, description: &str) -> Self {
        self.with_field(name, shape.into(), false, description)
    }

    fn with_field(mut self, name: &str, shape: Shape, required: bool, description: &str) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            shape,
            required,
            description: (!description.is_empty()).then(|| description.to_string()),
        });
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a raw argument bag and narrows it to [`Arguments`].
    ///
    /// `null` is treated as an empty object, since callers commonly omit the
    /// argument bag entirely for operations without required fields.
    /// Optional fields that are `null` are removed from the result.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found. A non-object bag fails at
    /// the path `arguments`.
    pub fn validate_arguments(&self, raw: Value) -> Result<Arguments, ValidationError> {
        let mut map = match raw {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ValidationError {
                    path: ROOT_PATH.to_string(),
                    problem: Problem::Mismatch {
                        expected: "object".to_string(),
                        found: json_kind(&other).to_string(),
                    },
                });
            }
        };
        self.check_fields(&map, &mut Vec::new())?;
        self.prune(&mut map);
        Ok(Arguments::from_validated(map))
    }

    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut schema = field.shape.to_json_schema();
            if let (Some(description), Value::Object(obj)) = (&field.description, &mut schema) {
                obj.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            properties.insert(field.name.clone(), schema);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }

    fn check_fields<'s>(
        &'s self,
        map: &Map<String, Value>,
        path: &mut Vec<PathSegment<'s>>,
    ) -> Result<(), ValidationError> {
        for field in &self.fields {
            match map.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        path.push(PathSegment::Field(&field.name));
                        return Err(ValidationError {
                            path: render_path(path),
                            problem: Problem::Missing {
                                expected: field.shape.describe(),
                            },
                        });
                    }
                }
                Some(value) => {
                    path.push(PathSegment::Field(&field.name));
                    field.shape.check(value, path)?;
                    path.pop();
                }
            }
        }
        Ok(())
    }

    fn prune(&self, map: &mut Map<String, Value>) {
        for field in &self.fields {
            match map.get_mut(&field.name) {
                Some(Value::Null) => {
                    map.remove(&field.name);
                }
                Some(value) => field.shape.prune(value),
                None => {}
            }
        }
    }
}

impl Serialize for ObjectShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

const ROOT_PATH: &str = "arguments";

#[derive(Debug, Clone, Copy)]
enum PathSegment<'a> {
    Field(&'a str),
    Index(usize),
}

fn render_path(path: &[PathSegment<'_>]) -> String {
    if path.is_empty() {
        return ROOT_PATH.to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

fn render_literals(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON type name of a value, as used in mismatch messages.
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What went wrong at the reported path.
///
/// Renders as the clause that follows the path in a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Problem {
    /// A required field is absent or `null`.
    #[error(" (expected {expected})")]
    Missing { expected: String },
    /// The value has the wrong JSON type.
    #[error(": expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
    /// The value is not one of the enum's literals.
    #[error(": expected one of {allowed}, found {found}")]
    NotInEnum { allowed: String, found: String },
}

impl Problem {
    fn lead(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "missing required field",
            Self::Mismatch { .. } | Self::NotInEnum { .. } => "invalid value for",
        }
    }
}

/// First structural mismatch found while validating a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{lead} `{path}`{problem}", lead = Problem::lead(.problem))]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `environment.values[0].key`.
    pub path: String,
    pub problem: Problem,
}

impl ValidationError {
    fn mismatch(path: &[PathSegment<'_>], expected: &Shape, found: &Value) -> Self {
        Self {
            path: render_path(path),
            problem: Problem::Mismatch {
                expected: expected.describe(),
                found: json_kind(found).to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
