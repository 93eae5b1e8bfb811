//! Pattern (type) descriptions returned by an evaluation.

use std::fmt;

use crate::schema;
use crate::{Error, Object, Result, StructuredValue};

/// Description of the pattern an input was evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: Option<String>,
    pub documentation: Option<String>,
    pub parameters: Vec<String>,
    pub inner: InnerPattern,
}

/// The shape of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum InnerPattern {
    Anything,
    Nothing,
    Primordial(Primordial),
    Const(StructuredValue),
    Object(Vec<Field>),
    List(Vec<Pattern>),
    Ref { name: String, arguments: Vec<Pattern> },
    Expr(String),
}

/// Built-in value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primordial {
    Integer,
    Decimal,
    Boolean,
    String,
}

/// One field of an object pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub optional: bool,
    pub ty: Pattern,
}

impl Pattern {
    pub fn anonymous(inner: InnerPattern) -> Self {
        Self {
            name: None,
            documentation: None,
            parameters: Vec::new(),
            inner,
        }
    }

    pub fn named(name: impl Into<String>, inner: InnerPattern) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::anonymous(inner)
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Pattern) -> Self {
        Self {
            name: name.into(),
            optional: false,
            ty,
        }
    }
}

impl Primordial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(Self::Integer),
            "decimal" => Some(Self::Decimal),
            "boolean" => Some(Self::Boolean),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn admits(&self, value: &StructuredValue) -> bool {
        matches!(
            (self, value),
            (Self::Integer, StructuredValue::Integer(_))
                | (Self::Decimal, StructuredValue::Decimal(_) | StructuredValue::Integer(_))
                | (Self::Boolean, StructuredValue::Boolean(_))
                | (Self::String, StructuredValue::String(_))
        )
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.inner),
        }
    }
}

impl fmt::Display for InnerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anything => write!(f, "anything"),
            Self::Nothing => write!(f, "nothing"),
            Self::Primordial(p) => write!(f, "{}", p.as_str()),
            Self::Const(value) => write!(f, "{}", value.to_json()),
            Self::Object(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let marker = if field.optional { "?" } else { "" };
                    write!(f, "{}{marker}: {}", field.name, field.ty)?;
                }
                write!(f, " }}")
            }
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Ref { name, arguments } if arguments.is_empty() => write!(f, "{name}"),
            Self::Ref { name, arguments } => {
                write!(f, "{name}<")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Self::Expr(expr) => write!(f, "${{{expr}}}"),
        }
    }
}

impl From<&Pattern> for StructuredValue {
    fn from(pattern: &Pattern) -> Self {
        Object::new()
            .with("name", pattern.name.clone())
            .with("documentation", pattern.documentation.clone())
            .with("parameters", pattern.parameters.clone())
            .with("inner", StructuredValue::from(&pattern.inner))
            .into()
    }
}

impl From<&InnerPattern> for StructuredValue {
    fn from(inner: &InnerPattern) -> Self {
        let object = match inner {
            InnerPattern::Anything => schema::tagged("anything"),
            InnerPattern::Nothing => schema::tagged("nothing"),
            InnerPattern::Primordial(p) => schema::tagged("primordial").with("type", p.as_str()),
            InnerPattern::Const(value) => schema::tagged("const").with("value", value.clone()),
            InnerPattern::Object(fields) => {
                let fields: Vec<StructuredValue> = fields
                    .iter()
                    .map(|field| {
                        Object::new()
                            .with("name", field.name.as_str())
                            .with("optional", field.optional)
                            .with("ty", StructuredValue::from(&field.ty))
                            .into()
                    })
                    .collect();
                schema::tagged("object").with("fields", fields)
            }
            InnerPattern::List(items) => schema::tagged("list").with(
                "items",
                items.iter().map(StructuredValue::from).collect::<Vec<_>>(),
            ),
            InnerPattern::Ref { name, arguments } => schema::tagged("ref")
                .with("name", name.as_str())
                .with(
                    "arguments",
                    arguments.iter().map(StructuredValue::from).collect::<Vec<_>>(),
                ),
            InnerPattern::Expr(expr) => schema::tagged("expr").with("expr", expr.as_str()),
        };
        object.into()
    }
}

impl TryFrom<&StructuredValue> for Pattern {
    type Error = Error;

    fn try_from(value: &StructuredValue) -> Result<Self> {
        let object = schema::object(value, "pattern")?;
        let parameters = schema::list(object, "parameters")?
            .iter()
            .map(|p| {
                p.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::schema("pattern parameters must be strings"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: schema::optional_string(object, "name")?,
            documentation: schema::optional_string(object, "documentation")?,
            parameters,
            inner: InnerPattern::try_from(schema::field(object, "inner")?)?,
        })
    }
}

impl TryFrom<&StructuredValue> for InnerPattern {
    type Error = Error;

    fn try_from(value: &StructuredValue) -> Result<Self> {
        let object = schema::object(value, "inner pattern")?;
        match schema::kind(object)? {
            "anything" => Ok(Self::Anything),
            "nothing" => Ok(Self::Nothing),
            "primordial" => {
                let name = schema::string(object, "type")?;
                Primordial::parse(&name)
                    .map(Self::Primordial)
                    .ok_or_else(|| Error::schema(format!("unknown primordial type '{name}'")))
            }
            "const" => Ok(Self::Const(schema::field(object, "value")?.clone())),
            "object" => schema::list(object, "fields")?
                .iter()
                .map(field_from)
                .collect::<Result<Vec<_>>>()
                .map(Self::Object),
            "list" => patterns(object, "items").map(Self::List),
            "ref" => Ok(Self::Ref {
                name: schema::string(object, "name")?,
                arguments: patterns(object, "arguments")?,
            }),
            "expr" => Ok(Self::Expr(schema::string(object, "expr")?)),
            other => Err(Error::schema(format!("unknown pattern kind '{other}'"))),
        }
    }
}

fn field_from(value: &StructuredValue) -> Result<Field> {
    let object = schema::object(value, "pattern field")?;
    Ok(Field {
        name: schema::string(object, "name")?,
        optional: schema::optional(object, "optional")
            .and_then(StructuredValue::as_bool)
            .unwrap_or(false),
        ty: Pattern::try_from(schema::field(object, "ty")?)?,
    })
}

fn patterns(object: &Object, name: &str) -> Result<Vec<Pattern>> {
    schema::list(object, name)?
        .iter()
        .map(Pattern::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dog() -> Pattern {
        Pattern::named(
            "dog",
            InnerPattern::Object(vec![
                Field::new("name", Pattern::anonymous(InnerPattern::Primordial(Primordial::String))),
                Field::new(
                    "trained",
                    Pattern::anonymous(InnerPattern::Primordial(Primordial::Boolean)),
                ),
            ]),
        )
    }

    #[test]
    fn pattern_survives_structured_encoding() {
        let pattern = dog();
        let encoded = StructuredValue::from(&pattern);
        assert_eq!(Pattern::try_from(&encoded).unwrap(), pattern);
    }

    #[test]
    fn display_renders_object_fields_in_order() {
        assert_eq!(dog().inner.to_string(), "{ name: string, trained: boolean }");
        assert_eq!(dog().to_string(), "dog");
    }

    #[test]
    fn unknown_kind_is_a_schema_error() {
        let value: StructuredValue = Object::new()
            .with("inner", Object::new().with("kind", "mystery"))
            .into();
        assert!(matches!(Pattern::try_from(&value), Err(Error::Schema(_))));
    }

    #[test]
    fn primordial_admits_matching_values() {
        assert!(Primordial::Boolean.admits(&true.into()));
        assert!(!Primordial::Boolean.admits(&"yes".into()));
        assert!(Primordial::Decimal.admits(&StructuredValue::Integer(1)));
        assert!(!Primordial::Integer.admits(&StructuredValue::Decimal(1.0)));
    }
}
