//! In-process stand-in for the policy engine component.
//!
//! Understands just enough of the policy language to check flat object
//! patterns: `pattern NAME = { field: type, ... }` with `string`,
//! `integer`, `decimal` and `boolean` fields. Values still cross the
//! host's wire encoding in both directions.

#![allow(dead_code)]

use host::{
    CapabilityProvider, Error, GuestComponent, GuestExports, GuestInstance, Result, StreamKind,
    marshal,
};
use value::{
    EvaluationRequest, EvaluationResultContext, Field, InnerPattern, Pattern, Primordial,
    Rationale, StructuredValue,
};

#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    missing_export: Option<&'static str>,
    refuse_instantiation: bool,
    greeting: Option<&'static str>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a component that lacks `export`.
    pub fn without_export(mut self, export: &'static str) -> Self {
        self.missing_export = Some(export);
        self
    }

    pub fn refusing_instantiation(mut self) -> Self {
        self.refuse_instantiation = true;
        self
    }

    /// Write `text` to the guest's stdout during `eval`.
    pub fn greeting(mut self, text: &'static str) -> Self {
        self.greeting = Some(text);
        self
    }
}

pub struct FakeInstance {
    engine: FakeEngine,
    provider: CapabilityProvider,
}

pub struct FakeExports {
    engine: FakeEngine,
    provider: CapabilityProvider,
}

impl GuestComponent for FakeEngine {
    type Instance = FakeInstance;

    fn instantiate(&self, provider: CapabilityProvider) -> Result<FakeInstance> {
        if self.refuse_instantiation {
            return Err(Error::Instantiation(
                "import `acme:net/sockets` not satisfied".into(),
            ));
        }
        Ok(FakeInstance {
            engine: self.clone(),
            provider,
        })
    }
}

impl GuestInstance for FakeInstance {
    type Exports = FakeExports;

    fn bind(self) -> Result<FakeExports> {
        if let Some(export) = self.engine.missing_export {
            return Err(Error::Binding(export.to_string()));
        }
        Ok(FakeExports {
            engine: self.engine,
            provider: self.provider,
        })
    }
}

impl GuestExports for FakeExports {
    fn version(&mut self) -> Result<String> {
        Ok("fake-engine 0.1.0".into())
    }

    fn eval(
        &mut self,
        request: &EvaluationRequest,
    ) -> Result<std::result::Result<EvaluationResultContext, String>> {
        if let Some(text) = self.engine.greeting {
            let stdout = self.provider.get_stream(StreamKind::Stdout);
            self.provider.blocking_write(stdout, text.as_bytes())?;
        }

        // The guest sees the input only after it crossed the wire.
        let input = marshal::lift_value(&marshal::lower_value(&request.input))?;
        let outcome = evaluate(request, input).map(|context| context.encode());

        match marshal::lift_eval_result(&marshal::lower_eval_result(&outcome))? {
            Ok(encoded) => Ok(Ok(EvaluationResultContext::decode(encoded)?)),
            Err(message) => Ok(Err(message)),
        }
    }
}

fn evaluate(
    request: &EvaluationRequest,
    input: StructuredValue,
) -> std::result::Result<EvaluationResultContext, String> {
    let mut sources = request.policies.clone();
    sources.push(request.policy.clone());

    let mut found = None;
    for source in &sources {
        for pattern in parse_patterns(source)? {
            if pattern.name.as_deref() == Some(request.name.as_str()) {
                found = Some(pattern);
            }
        }
    }
    let ty = found.ok_or_else(|| format!("no pattern named `{}` in the policy", request.name))?;

    let rationale = check(&ty, &input);
    let output = if rationale.satisfied() {
        input.clone()
    } else {
        StructuredValue::Null
    };
    Ok(EvaluationResultContext {
        input,
        ty,
        rationale,
        output,
    })
}

fn check(ty: &Pattern, input: &StructuredValue) -> Rationale {
    let InnerPattern::Object(fields) = &ty.inner else {
        return Rationale::Anything;
    };
    let Some(object) = input.as_object() else {
        return Rationale::NotAnObject;
    };
    Rationale::Object(
        fields
            .iter()
            .map(|field| {
                let outcome = object.get(&field.name).map(|value| match &field.ty.inner {
                    InnerPattern::Primordial(p) => Rationale::Primordial(p.admits(value)),
                    _ => Rationale::Anything,
                });
                (field.name.clone(), outcome)
            })
            .collect(),
    )
}

fn parse_patterns(source: &str) -> std::result::Result<Vec<Pattern>, String> {
    source
        .split("pattern ")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(parse_pattern)
        .collect()
}

fn parse_pattern(chunk: &str) -> std::result::Result<Pattern, String> {
    let (name, body) = chunk
        .split_once('=')
        .ok_or_else(|| format!("expected `=` in `{chunk}`"))?;
    let body = body
        .trim()
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .ok_or_else(|| format!("expected an object pattern in `{chunk}`"))?;

    let fields = body
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|field| {
            let (name, ty) = field
                .split_once(':')
                .ok_or_else(|| format!("expected `name: type` in `{field}`"))?;
            let primordial = Primordial::parse(ty.trim())
                .ok_or_else(|| format!("unknown type `{}`", ty.trim()))?;
            Ok(Field::new(
                name.trim(),
                Pattern::anonymous(InnerPattern::Primordial(primordial)),
            ))
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    Ok(Pattern::named(name.trim(), InnerPattern::Object(fields)))
}
