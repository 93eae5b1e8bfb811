//! Conversion between codec types and dynamic component values.
//!
//! A `structured-value` on the wire is a record `{ nodes, root }` whose
//! nodes are the variant cases of [`Node`]. Lifting checks shapes only;
//! structural checks (ordering, sharing) happen when the flat value is
//! unflattened.

use value::{EncodedResult, EvaluationRequest, FlatValue, Node, StructuredValue};
use wasmtime::component::Val;

use crate::{Error, Result};

pub fn lower_value(value: &StructuredValue) -> Val {
    lower_flat(&FlatValue::from(value))
}

pub fn lift_value(val: &Val) -> Result<StructuredValue> {
    Ok(lift_flat(val)?.unflatten()?)
}

pub fn lower_flat(flat: &FlatValue) -> Val {
    Val::Record(vec![
        (
            "nodes".to_string(),
            Val::List(flat.nodes.iter().map(lower_node).collect()),
        ),
        ("root".to_string(), Val::U32(flat.root)),
    ])
}

fn lower_node(node: &Node) -> Val {
    let case = |name: &str, payload: Option<Val>| {
        Val::Variant(name.to_string(), payload.map(Box::new))
    };
    match node {
        Node::Null => case("null", None),
        Node::Boolean(b) => case("boolean", Some(Val::Bool(*b))),
        Node::Integer(i) => case("integer", Some(Val::S64(*i))),
        Node::Decimal(d) => case("decimal", Some(Val::Float64(*d))),
        Node::String(s) => case("string", Some(Val::String(s.clone()))),
        Node::Octets(bytes) => case(
            "octets",
            Some(Val::List(bytes.iter().copied().map(Val::U8).collect())),
        ),
        Node::List(items) => case(
            "list",
            Some(Val::List(items.iter().copied().map(Val::U32).collect())),
        ),
        Node::Object(fields) => case(
            "object",
            Some(Val::List(
                fields
                    .iter()
                    .map(|(key, index)| {
                        Val::Tuple(vec![Val::String(key.clone()), Val::U32(*index)])
                    })
                    .collect(),
            )),
        ),
    }
}

pub fn lift_flat(val: &Val) -> Result<FlatValue> {
    let fields = record(val, "structured-value")?;
    let nodes = match field(fields, "nodes")? {
        Val::List(nodes) => nodes.iter().map(lift_node).collect::<Result<Vec<_>>>()?,
        other => return Err(unexpected("node list", other)),
    };
    let root = u32_of(field(fields, "root")?)?;
    Ok(FlatValue { nodes, root })
}

fn lift_node(val: &Val) -> Result<Node> {
    let Val::Variant(case, payload) = val else {
        return Err(unexpected("node variant", val));
    };
    let payload = payload.as_deref();
    let node = match (case.as_str(), payload) {
        ("null", None) => Node::Null,
        ("boolean", Some(Val::Bool(b))) => Node::Boolean(*b),
        ("integer", Some(Val::S64(i))) => Node::Integer(*i),
        ("decimal", Some(Val::Float64(d))) => Node::Decimal(*d),
        ("string", Some(Val::String(s))) => Node::String(s.clone()),
        ("octets", Some(Val::List(bytes))) => Node::Octets(
            bytes
                .iter()
                .map(|b| match b {
                    Val::U8(b) => Ok(*b),
                    other => Err(unexpected("byte", other)),
                })
                .collect::<Result<_>>()?,
        ),
        ("list", Some(Val::List(items))) => {
            Node::List(items.iter().map(u32_of).collect::<Result<_>>()?)
        }
        ("object", Some(Val::List(entries))) => Node::Object(
            entries
                .iter()
                .map(|entry| match entry {
                    Val::Tuple(pair) => match pair.as_slice() {
                        [Val::String(key), index] => Ok((key.clone(), u32_of(index)?)),
                        _ => Err(unexpected("object entry", entry)),
                    },
                    other => Err(unexpected("object entry", other)),
                })
                .collect::<Result<_>>()?,
        ),
        _ => return Err(Error::wire(format!("unknown node case `{case}`"))),
    };
    Ok(node)
}

/// Arguments for the guest's `eval` export, in parameter order.
pub fn eval_params(request: &EvaluationRequest) -> Vec<Val> {
    let strings = |items: &[String]| Val::List(items.iter().cloned().map(Val::String).collect());
    vec![
        strings(&request.policies),
        strings(&request.data),
        Val::String(request.policy.clone()),
        Val::String(request.name.clone()),
        lower_value(&request.input),
    ]
}

/// Lower an eval outcome the way a guest returns it.
pub fn lower_eval_result(result: &std::result::Result<EncodedResult, String>) -> Val {
    match result {
        Ok(encoded) => Val::Result(Ok(Some(Box::new(Val::Record(vec![
            ("input".to_string(), lower_flat(&encoded.input)),
            ("ty".to_string(), lower_flat(&encoded.ty)),
            ("rationale".to_string(), lower_flat(&encoded.rationale)),
            ("output".to_string(), lower_flat(&encoded.output)),
        ]))))),
        Err(message) => Val::Result(Err(Some(Box::new(Val::String(message.clone()))))),
    }
}

/// Lift the guest's `eval` result.
///
/// The outer `Result` is a host-side decoding failure; the inner one is
/// the guest's own verdict.
pub fn lift_eval_result(val: &Val) -> Result<std::result::Result<EncodedResult, String>> {
    let Val::Result(result) = val else {
        return Err(unexpected("result", val));
    };
    match result {
        Ok(Some(context)) => {
            let fields = record(context, "evaluation-result-context")?;
            Ok(Ok(EncodedResult {
                input: lift_flat(field(fields, "input")?)?,
                ty: lift_flat(field(fields, "ty")?)?,
                rationale: lift_flat(field(fields, "rationale")?)?,
                output: lift_flat(field(fields, "output")?)?,
            }))
        }
        Ok(None) => Err(Error::wire("eval succeeded without a context")),
        Err(Some(message)) => match message.as_ref() {
            Val::String(message) => Ok(Err(message.clone())),
            other => Err(unexpected("error message", other)),
        },
        Err(None) => Ok(Err("evaluation failed without a message".to_string())),
    }
}

fn record<'a>(val: &'a Val, what: &str) -> Result<&'a [(String, Val)]> {
    match val {
        Val::Record(fields) => Ok(fields),
        other => Err(unexpected(what, other)),
    }
}

fn field<'a>(fields: &'a [(String, Val)], name: &str) -> Result<&'a Val> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, val)| val)
        .ok_or_else(|| Error::wire(format!("record is missing field `{name}`")))
}

fn u32_of(val: &Val) -> Result<u32> {
    match val {
        Val::U32(n) => Ok(*n),
        other => Err(unexpected("u32", other)),
    }
}

fn unexpected(expected: &str, found: &Val) -> Error {
    Error::wire(format!("expected {expected}, found {found:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use value::{InnerPattern, Object, Pattern, Primordial, Rationale};

    fn dog() -> StructuredValue {
        Object::new()
            .with("name", "goodboy")
            .with("trained", true)
            .with(
                "owner",
                Object::new().with("name", "bob").with("verified", false),
            )
            .into()
    }

    #[test]
    fn values_round_trip_with_field_order() {
        let values: Vec<StructuredValue> = vec![
            dog(),
            StructuredValue::Null,
            StructuredValue::from(-7i64),
            StructuredValue::from(2.5f64),
            StructuredValue::Octets(vec![0, 1, 255]),
            StructuredValue::from(Vec::<StructuredValue>::new()),
            Object::new().into(),
            Object::new()
                .with("z", 1i64)
                .with("a", vec!["x", "y"])
                .with("m", Object::new().with("deep", Object::new()))
                .into(),
        ];
        for value in values {
            let lifted = lift_value(&lower_value(&value)).unwrap();
            assert_eq!(lifted, value);
            if let (Some(expected), Some(actual)) = (value.as_object(), lifted.as_object()) {
                assert!(expected.keys().eq(actual.keys()));
            }
        }
    }

    #[test]
    fn eval_params_follow_parameter_order() {
        let request = EvaluationRequest::new("pattern dog = { name: string }", "dog", dog())
            .with_policy("pattern aux = integer")
            .with_data("data");
        let params = eval_params(&request);
        assert_eq!(params.len(), 5);
        assert_eq!(
            params[0],
            Val::List(vec![Val::String("pattern aux = integer".into())])
        );
        assert_eq!(params[1], Val::List(vec![Val::String("data".into())]));
        assert_eq!(params[3], Val::String("dog".into()));
        assert_eq!(lift_value(&params[4]).unwrap(), dog());
    }

    #[test]
    fn eval_result_round_trips() {
        let encoded = value::EvaluationResultContext {
            input: dog(),
            ty: Pattern::anonymous(InnerPattern::Primordial(Primordial::Boolean)),
            rationale: Rationale::Primordial(true),
            output: dog(),
        }
        .encode();

        let ok = lift_eval_result(&lower_eval_result(&Ok(encoded.clone()))).unwrap();
        assert_eq!(ok, Ok(encoded));

        let err = lift_eval_result(&lower_eval_result(&Err("no such pattern".into()))).unwrap();
        assert_eq!(err, Err("no such pattern".to_string()));
    }

    #[test]
    fn malformed_values_are_wire_errors() {
        let cases = [
            Val::Bool(true),
            Val::Record(vec![("root".into(), Val::U32(0))]),
            Val::Record(vec![
                ("nodes".into(), Val::List(vec![Val::Variant("float".into(), None)])),
                ("root".into(), Val::U32(0)),
            ]),
            Val::Record(vec![
                (
                    "nodes".into(),
                    Val::List(vec![Val::Variant(
                        "boolean".into(),
                        Some(Box::new(Val::String("yes".into()))),
                    )]),
                ),
                ("root".into(), Val::U32(0)),
            ]),
        ];
        for case in cases {
            assert!(matches!(
                lift_value(&case),
                Err(Error::Codec(value::Error::Wire(_)))
            ));
        }
    }

    #[test]
    fn dangling_root_is_rejected() {
        let val = Val::Record(vec![
            ("nodes".into(), Val::List(vec![])),
            ("root".into(), Val::U32(0)),
        ]);
        assert!(matches!(lift_value(&val), Err(Error::Codec(_))));
    }
}
