//! Evaluation requests and results.

use crate::{FlatValue, Pattern, Rationale, Result, StructuredValue, Violation};

/// Everything the guest needs for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    /// Auxiliary policy sources, in order.
    pub policies: Vec<String>,
    /// Auxiliary data sources, in order.
    pub data: Vec<String>,
    /// The primary policy source.
    pub policy: String,
    /// Name of the pattern to evaluate.
    pub name: String,
    pub input: StructuredValue,
}

impl EvaluationRequest {
    pub fn new(
        policy: impl Into<String>,
        name: impl Into<String>,
        input: impl Into<StructuredValue>,
    ) -> Self {
        Self {
            policies: Vec::new(),
            data: Vec::new(),
            policy: policy.into(),
            name: name.into(),
            input: input.into(),
        }
    }

    /// Add an auxiliary policy source.
    pub fn with_policy(mut self, source: impl Into<String>) -> Self {
        self.policies.push(source.into());
        self
    }

    /// Add an auxiliary data source.
    pub fn with_data(mut self, source: impl Into<String>) -> Self {
        self.data.push(source.into());
        self
    }
}

/// A successful evaluation, decoded into host types.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResultContext {
    /// The input as the guest saw it.
    pub input: StructuredValue,
    /// The pattern the input was evaluated against.
    pub ty: Pattern,
    pub rationale: Rationale,
    pub output: StructuredValue,
}

impl EvaluationResultContext {
    pub fn satisfied(&self) -> bool {
        self.rationale.satisfied()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.rationale.violations()
    }

    /// Decode the wire form returned by a guest.
    pub fn decode(encoded: EncodedResult) -> Result<Self> {
        let ty = encoded.ty.unflatten()?;
        let rationale = encoded.rationale.unflatten()?;
        Ok(Self {
            input: encoded.input.unflatten()?,
            ty: Pattern::try_from(&ty)?,
            rationale: Rationale::try_from(&rationale)?,
            output: encoded.output.unflatten()?,
        })
    }

    pub fn encode(&self) -> EncodedResult {
        EncodedResult {
            input: FlatValue::from(&self.input),
            ty: FlatValue::from(StructuredValue::from(&self.ty)),
            rationale: FlatValue::from(StructuredValue::from(&self.rationale)),
            output: FlatValue::from(&self.output),
        }
    }

    /// The whole result as one structured value, for display.
    pub fn to_structured(&self) -> StructuredValue {
        let violations: Vec<StructuredValue> = self
            .violations()
            .into_iter()
            .map(|v| {
                crate::Object::new()
                    .with("path", v.path_string())
                    .with("severity", v.severity.as_str())
                    .with("reason", v.reason)
                    .into()
            })
            .collect();
        crate::Object::new()
            .with("input", self.input.clone())
            .with("ty", StructuredValue::from(&self.ty))
            .with("rationale", StructuredValue::from(&self.rationale))
            .with("output", self.output.clone())
            .with("satisfied", self.satisfied())
            .with("violations", violations)
            .into()
    }
}

/// The wire form of an evaluation result: four flat values.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedResult {
    pub input: FlatValue,
    pub ty: FlatValue,
    pub rationale: FlatValue,
    pub output: FlatValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, InnerPattern, Object, Primordial};

    #[test]
    fn request_builder_keeps_source_order() {
        let request = EvaluationRequest::new("pattern a = string", "a", "x")
            .with_policy("p1")
            .with_policy("p2")
            .with_data("d1");
        assert_eq!(request.policies, ["p1", "p2"]);
        assert_eq!(request.data, ["d1"]);
        assert_eq!(request.input, StructuredValue::from("x"));
    }

    #[test]
    fn context_survives_wire_encoding() {
        let input: StructuredValue = Object::new()
            .with("name", "goodboy")
            .with("trained", true)
            .into();
        let context = EvaluationResultContext {
            input: input.clone(),
            ty: Pattern::named(
                "dog",
                InnerPattern::Object(vec![Field::new(
                    "name",
                    Pattern::anonymous(InnerPattern::Primordial(Primordial::String)),
                )]),
            ),
            rationale: Rationale::Object(vec![("name".into(), Some(Rationale::Primordial(true)))]),
            output: input,
        };
        let decoded = EvaluationResultContext::decode(context.encode()).unwrap();
        assert_eq!(decoded, context);
        assert!(decoded.satisfied());
    }

    #[test]
    fn decode_rejects_malformed_rationale() {
        let mut encoded = EvaluationResultContext {
            input: StructuredValue::Null,
            ty: Pattern::anonymous(InnerPattern::Anything),
            rationale: Rationale::Anything,
            output: StructuredValue::Null,
        }
        .encode();
        encoded.rationale = FlatValue::from(StructuredValue::from("not a rationale"));
        assert!(EvaluationResultContext::decode(encoded).is_err());
    }
}
