//! Helpers for reading typed schemas out of structured values.

use crate::{Error, Object, Result, StructuredValue};

pub(crate) fn object<'a>(value: &'a StructuredValue, what: &str) -> Result<&'a Object> {
    value.as_object().ok_or_else(|| {
        Error::schema(format!("{what} must be an object, got {}", value.type_name()))
    })
}

pub(crate) fn field<'a>(object: &'a Object, name: &str) -> Result<&'a StructuredValue> {
    object
        .get(name)
        .ok_or_else(|| Error::schema(format!("missing field '{name}'")))
}

/// A field that may be absent or `null`.
pub(crate) fn optional<'a>(object: &'a Object, name: &str) -> Option<&'a StructuredValue> {
    object.get(name).filter(|value| !value.is_null())
}

pub(crate) fn string(object: &Object, name: &str) -> Result<String> {
    let value = field(object, name)?;
    value.as_str().map(str::to_string).ok_or_else(|| {
        Error::schema(format!("field '{name}' must be a string, got {}", value.type_name()))
    })
}

pub(crate) fn optional_string(object: &Object, name: &str) -> Result<Option<String>> {
    optional(object, name)
        .map(|value| {
            value.as_str().map(str::to_string).ok_or_else(|| {
                Error::schema(format!("field '{name}' must be a string, got {}", value.type_name()))
            })
        })
        .transpose()
}

pub(crate) fn boolean(object: &Object, name: &str) -> Result<bool> {
    let value = field(object, name)?;
    value.as_bool().ok_or_else(|| {
        Error::schema(format!("field '{name}' must be a boolean, got {}", value.type_name()))
    })
}

/// A list field; absent or `null` reads as empty.
pub(crate) fn list<'a>(object: &'a Object, name: &str) -> Result<&'a [StructuredValue]> {
    match optional(object, name) {
        None => Ok(&[]),
        Some(value) => value.as_list().ok_or_else(|| {
            Error::schema(format!("field '{name}' must be a list, got {}", value.type_name()))
        }),
    }
}

/// The `kind` discriminator of a tagged object.
pub(crate) fn kind<'a>(object: &'a Object) -> Result<&'a str> {
    let value = field(object, "kind")?;
    value
        .as_str()
        .ok_or_else(|| Error::schema("field 'kind' must be a string"))
}

pub(crate) fn tagged(kind: &str) -> Object {
    Object::new().with("kind", kind)
}
