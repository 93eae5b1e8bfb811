//! Rationale trees explaining an evaluation outcome.

use crate::pattern::Pattern;
use crate::schema;
use crate::{Error, Object, Result, StructuredValue};

/// How serious an unsatisfied rationale is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    None,
    Advice,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Advice => "advice",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "advice" => Some(Self::Advice),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// The most severe of all items; `None` when empty.
impl FromIterator<Severity> for Severity {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        iter.into_iter().max().unwrap_or_default()
    }
}

/// Why a value did or did not match a pattern.
///
/// Composite rationales carry the rationales of their parts, so the tree
/// can be walked to find exactly which field or item failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Rationale {
    Anything,
    Nothing,
    NotAnObject,
    NotAList,
    MissingField(String),
    InvalidArgument(String),
    Const(bool),
    Primordial(bool),
    Expression(bool),
    /// Per-field outcomes in pattern order; `None` marks a missing field.
    Object(Vec<(String, Option<Rationale>)>),
    List(Vec<Rationale>),
    Chain(Vec<Rationale>),
    Function {
        severity: Severity,
        rationale: Option<Box<Rationale>>,
        supporting: Vec<Rationale>,
    },
    /// A parameterized pattern's outcome together with the patterns its
    /// parameters were bound to, in binding order.
    Bound {
        rationale: Box<Rationale>,
        bindings: Vec<(String, Pattern)>,
    },
}

/// A single unsatisfied constraint found in a rationale tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field names and list indices leading to the constraint.
    pub path: Vec<String>,
    pub severity: Severity,
    pub reason: String,
}

impl Violation {
    /// Dotted path, empty for the root.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl Rationale {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Anything => Severity::None,
            Self::Nothing
            | Self::NotAnObject
            | Self::NotAList
            | Self::MissingField(_)
            | Self::InvalidArgument(_) => Severity::Error,
            Self::Const(ok) | Self::Primordial(ok) | Self::Expression(ok) => {
                if *ok {
                    Severity::None
                } else {
                    Severity::Error
                }
            }
            Self::Object(fields) => fields
                .iter()
                .map(|(_, r)| r.as_ref().map(Self::severity).unwrap_or(Severity::Error))
                .collect(),
            Self::List(items) | Self::Chain(items) => items.iter().map(Self::severity).collect(),
            Self::Function { severity, .. } => *severity,
            Self::Bound { rationale, .. } => rationale.severity(),
        }
    }

    /// True unless the rationale carries an error.
    pub fn satisfied(&self) -> bool {
        self.severity() < Severity::Error
    }

    pub fn reason(&self) -> String {
        let ok = self.satisfied();
        let pick = |yes: &str, no: &str| if ok { yes.to_string() } else { no.to_string() };
        match self {
            Self::Anything => "anything is satisfied by anything".into(),
            Self::Nothing => "nothing can satisfy this pattern".into(),
            Self::NotAnObject => "not an object".into(),
            Self::NotAList => "not a list".into(),
            Self::MissingField(name) => format!("missing field: {name}"),
            Self::InvalidArgument(name) => format!("invalid argument: {name}"),
            Self::Const(_) => pick(
                "the input matches the expected constant value",
                "the input does not match the expected constant value",
            ),
            Self::Primordial(_) => pick(
                "the primordial type is satisfied",
                "the primordial type is not satisfied",
            ),
            Self::Expression(_) => pick(
                "the expression is satisfied",
                "the expression is not satisfied",
            ),
            Self::Object(_) => pick(
                "all fields were satisfied",
                "not all fields were satisfied",
            ),
            Self::List(_) => pick(
                "all members were satisfied",
                "not all members were satisfied",
            ),
            Self::Chain(_) => pick("the chain was satisfied", "the chain was not satisfied"),
            Self::Function { rationale, .. } => match rationale {
                Some(inner) => inner.reason(),
                None => pick(
                    "the input satisfies the function",
                    "the input does not satisfy the function",
                ),
            },
            Self::Bound { rationale, .. } => rationale.reason(),
        }
    }

    /// Every unsatisfied leaf, attributed to the field path that led to it.
    pub fn violations(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_violations(&mut path, &mut out);
        out
    }

    fn collect_violations(&self, path: &mut Vec<String>, out: &mut Vec<Violation>) {
        if self.severity() == Severity::None {
            return;
        }
        match self {
            Self::Object(fields) => {
                for (name, outcome) in fields {
                    path.push(name.clone());
                    match outcome {
                        Some(inner) => inner.collect_violations(path, out),
                        None => out.push(Violation {
                            path: path.clone(),
                            severity: Severity::Error,
                            reason: format!("missing field: {name}"),
                        }),
                    }
                    path.pop();
                }
            }
            Self::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(index.to_string());
                    item.collect_violations(path, out);
                    path.pop();
                }
            }
            Self::Chain(items) => {
                for item in items {
                    item.collect_violations(path, out);
                }
            }
            Self::Function {
                rationale,
                supporting,
                ..
            } => {
                let before = out.len();
                if let Some(inner) = rationale {
                    inner.collect_violations(path, out);
                }
                for item in supporting {
                    item.collect_violations(path, out);
                }
                if out.len() == before {
                    out.push(self.leaf(path));
                }
            }
            Self::Bound { rationale, .. } => rationale.collect_violations(path, out),
            _ => out.push(self.leaf(path)),
        }
    }

    fn leaf(&self, path: &[String]) -> Violation {
        Violation {
            path: path.to_vec(),
            severity: self.severity(),
            reason: self.reason(),
        }
    }
}

impl From<&Rationale> for StructuredValue {
    fn from(rationale: &Rationale) -> Self {
        let object = match rationale {
            Rationale::Anything => schema::tagged("anything"),
            Rationale::Nothing => schema::tagged("nothing"),
            Rationale::NotAnObject => schema::tagged("not-an-object"),
            Rationale::NotAList => schema::tagged("not-a-list"),
            Rationale::MissingField(name) => {
                schema::tagged("missing-field").with("field", name.as_str())
            }
            Rationale::InvalidArgument(name) => {
                schema::tagged("invalid-argument").with("argument", name.as_str())
            }
            Rationale::Const(ok) => schema::tagged("const").with("satisfied", *ok),
            Rationale::Primordial(ok) => schema::tagged("primordial").with("satisfied", *ok),
            Rationale::Expression(ok) => schema::tagged("expression").with("satisfied", *ok),
            Rationale::Object(fields) => {
                let fields: Object = fields
                    .iter()
                    .map(|(name, outcome)| {
                        (name.as_str(), outcome.as_ref().map(StructuredValue::from))
                    })
                    .collect();
                schema::tagged("object").with("fields", fields)
            }
            Rationale::List(items) => schema::tagged("list").with("items", encode_all(items)),
            Rationale::Chain(items) => schema::tagged("chain").with("items", encode_all(items)),
            Rationale::Function {
                severity,
                rationale,
                supporting,
            } => schema::tagged("function")
                .with("severity", severity.as_str())
                .with(
                    "rationale",
                    rationale.as_deref().map(StructuredValue::from),
                )
                .with("supporting", encode_all(supporting)),
            Rationale::Bound {
                rationale,
                bindings,
            } => {
                let bindings: Object = bindings
                    .iter()
                    .map(|(name, pattern)| (name.as_str(), StructuredValue::from(pattern)))
                    .collect();
                schema::tagged("bound")
                    .with("rationale", StructuredValue::from(&**rationale))
                    .with("bindings", bindings)
            }
        };
        object.into()
    }
}

fn encode_all(items: &[Rationale]) -> Vec<StructuredValue> {
    items.iter().map(StructuredValue::from).collect()
}

impl TryFrom<&StructuredValue> for Rationale {
    type Error = Error;

    fn try_from(value: &StructuredValue) -> Result<Self> {
        let object = schema::object(value, "rationale")?;
        match schema::kind(object)? {
            "anything" => Ok(Self::Anything),
            "nothing" => Ok(Self::Nothing),
            "not-an-object" => Ok(Self::NotAnObject),
            "not-a-list" => Ok(Self::NotAList),
            "missing-field" => Ok(Self::MissingField(schema::string(object, "field")?)),
            "invalid-argument" => Ok(Self::InvalidArgument(schema::string(object, "argument")?)),
            "const" => Ok(Self::Const(schema::boolean(object, "satisfied")?)),
            "primordial" => Ok(Self::Primordial(schema::boolean(object, "satisfied")?)),
            "expression" => Ok(Self::Expression(schema::boolean(object, "satisfied")?)),
            "object" => {
                let fields = schema::object(schema::field(object, "fields")?, "rationale fields")?;
                fields
                    .iter()
                    .map(|(name, outcome)| {
                        let outcome = match outcome {
                            StructuredValue::Null => None,
                            other => Some(Self::try_from(other)?),
                        };
                        Ok((name.to_string(), outcome))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Self::Object)
            }
            "list" => decode_all(object).map(Self::List),
            "chain" => decode_all(object).map(Self::Chain),
            "function" => {
                let severity = schema::string(object, "severity")?;
                let severity = Severity::parse(&severity)
                    .ok_or_else(|| Error::schema(format!("unknown severity '{severity}'")))?;
                let rationale = schema::optional(object, "rationale")
                    .map(Self::try_from)
                    .transpose()?
                    .map(Box::new);
                let supporting = schema::list(object, "supporting")?
                    .iter()
                    .map(Self::try_from)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Function {
                    severity,
                    rationale,
                    supporting,
                })
            }
            "bound" => {
                let rationale = Box::new(Self::try_from(schema::field(object, "rationale")?)?);
                let bindings = match schema::optional(object, "bindings") {
                    None => Vec::new(),
                    Some(value) => schema::object(value, "rationale bindings")?
                        .iter()
                        .map(|(name, pattern)| Ok((name.to_string(), Pattern::try_from(pattern)?)))
                        .collect::<Result<Vec<_>>>()?,
                };
                Ok(Self::Bound {
                    rationale,
                    bindings,
                })
            }
            other => Err(Error::schema(format!("unknown rationale kind '{other}'"))),
        }
    }
}

fn decode_all(object: &Object) -> Result<Vec<Rationale>> {
    schema::list(object, "items")?
        .iter()
        .map(Rationale::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{InnerPattern, Primordial};

    fn mismatch() -> Rationale {
        Rationale::Bound {
            rationale: Box::new(Rationale::Object(vec![
                ("name".into(), Some(Rationale::Primordial(true))),
                ("trained".into(), Some(Rationale::Primordial(false))),
            ])),
            bindings: vec![(
                "T".into(),
                Pattern::anonymous(InnerPattern::Primordial(Primordial::Boolean)),
            )],
        }
    }

    #[test]
    fn severity_of_composites_is_the_maximum() {
        let severity: Severity = [Severity::Advice, Severity::Warning, Severity::None]
            .into_iter()
            .collect();
        assert_eq!(severity, Severity::Warning);
        assert_eq!(Vec::<Severity>::new().into_iter().collect::<Severity>(), Severity::None);
        assert_eq!(mismatch().severity(), Severity::Error);
        assert!(Rationale::Object(Vec::new()).satisfied());
    }

    #[test]
    fn violations_are_field_attributed() {
        let violations = mismatch().violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path_string(), "trained");
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0].reason.contains("not satisfied"));
    }

    #[test]
    fn missing_field_is_reported_at_its_path() {
        let rationale = Rationale::Object(vec![
            ("name".into(), Some(Rationale::Primordial(true))),
            ("trained".into(), None),
        ]);
        let violations = rationale.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, vec!["trained".to_string()]);
        assert_eq!(violations[0].reason, "missing field: trained");
    }

    #[test]
    fn satisfied_tree_has_no_violations() {
        let rationale = Rationale::Object(vec![
            ("name".into(), Some(Rationale::Primordial(true))),
            ("tags".into(), Some(Rationale::List(vec![Rationale::Anything]))),
        ]);
        assert!(rationale.satisfied());
        assert!(rationale.violations().is_empty());
    }

    #[test]
    fn function_warning_is_reported_without_failing() {
        let rationale = Rationale::Function {
            severity: Severity::Warning,
            rationale: None,
            supporting: Vec::new(),
        };
        assert!(rationale.satisfied());
        let violations = rationale.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert!(violations[0].path.is_empty());
    }

    #[test]
    fn list_violations_carry_indices() {
        let rationale = Rationale::List(vec![Rationale::Const(true), Rationale::Const(false)]);
        let violations = rationale.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path_string(), "1");
    }

    #[test]
    fn rationale_survives_structured_encoding() {
        let rationale = Rationale::Chain(vec![
            mismatch(),
            Rationale::Object(vec![("owner".into(), None)]),
            Rationale::Function {
                severity: Severity::Advice,
                rationale: Some(Box::new(Rationale::InvalidArgument("x".into()))),
                supporting: vec![Rationale::NotAList, Rationale::Expression(true)],
            },
        ]);
        let encoded = StructuredValue::from(&rationale);
        assert_eq!(Rationale::try_from(&encoded).unwrap(), rationale);
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let value: StructuredValue = Object::new()
            .with("kind", "function")
            .with("severity", "catastrophic")
            .into();
        assert!(matches!(Rationale::try_from(&value), Err(Error::Schema(_))));
    }

    #[test]
    fn bound_rationale_keeps_its_bindings() {
        let encoded = StructuredValue::from(&mismatch());
        let bindings = encoded
            .as_object()
            .and_then(|o| o.get("bindings"))
            .and_then(StructuredValue::as_object)
            .unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings.get("T").is_some());

        let Rationale::Bound { bindings, .. } = Rationale::try_from(&encoded).unwrap() else {
            panic!("expected a bound rationale");
        };
        assert_eq!(bindings[0].0, "T");
        assert_eq!(
            bindings[0].1.inner,
            InnerPattern::Primordial(Primordial::Boolean)
        );
    }

    #[test]
    fn bound_rationale_without_bindings_decodes() {
        let value: StructuredValue = schema::tagged("bound")
            .with("rationale", StructuredValue::from(&Rationale::Anything))
            .into();
        assert_eq!(
            Rationale::try_from(&value).unwrap(),
            Rationale::Bound {
                rationale: Box::new(Rationale::Anything),
                bindings: Vec::new(),
            }
        );
    }
}
