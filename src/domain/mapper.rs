//! Mappers: the projection between a domain value and a group's
//! representation (one value per child, keyed by child name).
//!
//! Round-trip law: `from_representation(to_representation(x))` must be
//! domain-equivalent to `x` for every well-formed `x`. `to_representation`
//! may add placeholders for missing optional fields.

use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::error::{FormError, FormResult};
use crate::domain::path::FieldPath;

/// Value shape a group holds: child name -> child value.
pub type Representation = Map<String, Value>;

type ToRepresentation = Rc<dyn Fn(&Value) -> FormResult<Representation>>;
type FromRepresentation = Rc<dyn Fn(&Representation) -> FormResult<Value>>;

#[derive(Clone)]
pub struct Mapper {
    to: ToRepresentation,
    from: FromRepresentation,
}

fn mapping_error(message: impl Into<String>) -> FormError {
    FormError::Mapping {
        path: FieldPath::root(),
        message: message.into(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn object_or_empty(value: &Value) -> FormResult<Representation> {
    match value {
        Value::Null => Ok(Representation::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(mapping_error(format!(
            "expected an object, got {}",
            type_name(other)
        ))),
    }
}

impl Mapper {
    /// Mapper from two total functions over JSON values.
    pub fn new(
        to: impl Fn(&Value) -> Representation + 'static,
        from: impl Fn(&Representation) -> Value + 'static,
    ) -> Self {
        Self {
            to: Rc::new(move |v| Ok(to(v))),
            from: Rc::new(move |r| Ok(from(r))),
        }
    }

    /// Mapper whose functions may reject a value.
    pub fn try_new(
        to: impl Fn(&Value) -> FormResult<Representation> + 'static,
        from: impl Fn(&Representation) -> FormResult<Value> + 'static,
    ) -> Self {
        Self {
            to: Rc::new(to),
            from: Rc::new(from),
        }
    }

    /// Domain object fields are the representation; `null` maps to no fields.
    pub fn identity() -> Self {
        Self::try_new(object_or_empty, |rep| Ok(Value::Object(rep.clone())))
    }

    /// Keeps only `fields` of the domain object; missing ones are left to
    /// the children's defaults.
    pub fn projection(fields: &[&str]) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let keep = fields.clone();
        Self::try_new(
            move |value| {
                let mut source = object_or_empty(value)?;
                let mut rep = Representation::new();
                for field in &keep {
                    if let Some(v) = source.remove(field) {
                        rep.insert(field.clone(), v);
                    }
                }
                Ok(rep)
            },
            move |rep| {
                let mut out = Map::new();
                for field in &fields {
                    out.insert(field.clone(), rep.get(field).cloned().unwrap_or(Value::Null));
                }
                Ok(Value::Object(out))
            },
        )
    }

    /// Like [`Mapper::projection`], plus a constant discriminant written back
    /// on the way out (`vehicleType: "Spaceship"`).
    pub fn projection_tagged(fields: &[&str], tag_key: &str, tag_value: impl Into<Value>) -> Self {
        let inner = Self::projection(fields);
        let from_inner = inner.from.clone();
        let tag_key = tag_key.to_string();
        let tag_value = tag_value.into();
        Self::try_new(
            move |value| (inner.to)(value),
            move |rep| {
                let mut out = from_inner(rep)?;
                if let Value::Object(map) = &mut out {
                    map.insert(tag_key.clone(), tag_value.clone());
                }
                Ok(out)
            },
        )
    }

    /// Puts the whole domain value under a single child: `x <-> { field: x }`.
    pub fn wrapping(field: &str) -> Self {
        let to_key = field.to_string();
        let from_key = field.to_string();
        Self::new(
            move |value| {
                let mut rep = Representation::new();
                rep.insert(to_key.clone(), value.clone());
                rep
            },
            move |rep| rep.get(&from_key).cloned().unwrap_or(Value::Null),
        )
    }

    /// Mapper over typed domain and representation structs.
    ///
    /// A `null` domain value produces an empty representation (children
    /// fall back to their defaults). Serde failures surface as
    /// [`FormError::Mapping`].
    pub fn typed<D, R>(to: impl Fn(&D) -> R + 'static, from: impl Fn(&R) -> D + 'static) -> Self
    where
        D: Serialize + DeserializeOwned + 'static,
        R: Serialize + DeserializeOwned + 'static,
    {
        Self::try_new(
            move |value| {
                if value.is_null() {
                    return Ok(Representation::new());
                }
                let domain: D = serde_json::from_value(value.clone())
                    .map_err(|e| mapping_error(format!("domain value: {e}")))?;
                let rep = serde_json::to_value(to(&domain))
                    .map_err(|e| mapping_error(format!("representation: {e}")))?;
                object_or_empty(&rep)
            },
            move |rep| {
                let typed: R = serde_json::from_value(Value::Object(rep.clone()))
                    .map_err(|e| mapping_error(format!("representation: {e}")))?;
                serde_json::to_value(from(&typed))
                    .map_err(|e| mapping_error(format!("domain value: {e}")))
            },
        )
    }

    pub fn to_representation(&self, value: &Value) -> FormResult<Representation> {
        (self.to)(value)
    }

    pub fn from_representation(&self, rep: &Representation) -> FormResult<Value> {
        (self.from)(rep)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper").finish_non_exhaustive()
    }
}
