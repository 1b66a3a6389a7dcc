//! Declared modifier signatures and their canonical rendering.
//!
//! A [`Signature`] is the explicit stand-in for inspecting a callable: the
//! modifier author lists the parameters the function body reads, optionally
//! with defaults for non-physical tuning knobs, and optionally names the
//! function that produced the modifier together with the values it captured.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tb_core::errors::{ErrorInfo, TbError};

use crate::quantity::{ModifierKind, Quantity};

/// A concrete value bound to a non-physical parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Real number.
    Float(f64),
    /// Text.
    Str(String),
}

impl BoundValue {
    /// Numeric view (integers widen).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BoundValue::Int(value) => Some(*value as f64),
            BoundValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BoundValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BoundValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Text view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BoundValue::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Bool(value) => write!(f, "{value}"),
            BoundValue::Int(value) => write!(f, "{value}"),
            BoundValue::Float(value) => write!(f, "{value:?}"),
            BoundValue::Str(value) => write!(f, "'{value}'"),
        }
    }
}

impl From<bool> for BoundValue {
    fn from(value: bool) -> Self {
        BoundValue::Bool(value)
    }
}

impl From<i32> for BoundValue {
    fn from(value: i32) -> Self {
        BoundValue::Int(i64::from(value))
    }
}

impl From<i64> for BoundValue {
    fn from(value: i64) -> Self {
        BoundValue::Int(value)
    }
}

impl From<u32> for BoundValue {
    fn from(value: u32) -> Self {
        BoundValue::Int(i64::from(value))
    }
}

impl From<f32> for BoundValue {
    fn from(value: f32) -> Self {
        BoundValue::Float(f64::from(value))
    }
}

impl From<f64> for BoundValue {
    fn from(value: f64) -> Self {
        BoundValue::Float(value)
    }
}

impl From<&str> for BoundValue {
    fn from(value: &str) -> Self {
        BoundValue::Str(value.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(value: String) -> Self {
        BoundValue::Str(value)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name.
    pub name: String,
    /// Default value; defaulted parameters are bound extras, not quantities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<BoundValue>,
}

/// Declared shape of a modifier function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    params: Vec<ParamDecl>,
    #[serde(default)]
    bound: Vec<(String, BoundValue)>,
}

/// Result of checking a signature against a kind's vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct Introspection {
    /// Requested quantities in declaration order.
    pub requested: Vec<Quantity>,
    /// Defaulted parameters in declaration order.
    pub extras: Vec<(String, BoundValue)>,
}

impl Signature {
    /// Starts a signature for a function called `name` with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
            params: Vec::new(),
            bound: Vec::new(),
        }
    }

    /// Appends parameters without defaults.
    pub fn args<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params
            .extend(names.into_iter().map(|name| ParamDecl {
                name: name.into(),
                default: None,
            }));
        self
    }

    /// Appends one parameter without a default.
    pub fn arg(self, name: impl Into<String>) -> Self {
        self.args([name.into()])
    }

    /// Appends a parameter with a default value.
    pub fn default(mut self, name: impl Into<String>, value: impl Into<BoundValue>) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            default: Some(value.into()),
        });
        self
    }

    /// Records the qualified name of the function that produced the modifier,
    /// e.g. `"sweep.<locals>.strain"`.
    pub fn within(mut self, qualified_name: impl Into<String>) -> Self {
        self.scope = Some(qualified_name.into());
        self
    }

    /// Records a value captured from the enclosing function.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<BoundValue>) -> Self {
        self.bound.push((name.into(), value.into()));
        self
    }

    /// The modifier function's own name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name of the enclosing function, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Values captured from the enclosing function.
    pub fn bound(&self) -> &[(String, BoundValue)] {
        &self.bound
    }

    /// Name shown by `Display`: the bare enclosing function name when there is
    /// one, otherwise the modifier's own name.
    pub fn display_name(&self) -> &str {
        match &self.scope {
            Some(scope) => scope.rsplit('.').next().unwrap_or(scope),
            None => &self.name,
        }
    }

    /// Fully qualified name used by [`Signature::repr`].
    pub fn qualified_name(&self) -> &str {
        self.scope.as_deref().unwrap_or(&self.name)
    }

    /// Captured values followed by defaulted parameters, in declaration order.
    pub fn bound_values(&self) -> Vec<(&str, &BoundValue)> {
        let captured = self
            .bound
            .iter()
            .map(|(name, value)| (name.as_str(), value));
        let defaults = self.params.iter().filter_map(|param| {
            param
                .default
                .as_ref()
                .map(|value| (param.name.as_str(), value))
        });
        captured.chain(defaults).collect()
    }

    /// Unambiguous form, e.g. `sweep.<locals>.strain(a=1, b=8)`.
    pub fn repr(&self) -> String {
        self.render(self.qualified_name())
    }

    fn render(&self, head: &str) -> String {
        let args = self
            .bound_values()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{head}({args})")
    }

    /// Classifies every parameter against `kind`'s vocabulary.
    ///
    /// All offending names are reported together.
    pub fn introspect(&self, kind: ModifierKind) -> Result<Introspection, TbError> {
        let mut seen = BTreeSet::new();
        let mut requested = Vec::new();
        let mut extras = Vec::new();
        let mut unexpected = Vec::new();

        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(self.signature_error(
                    kind,
                    "modifier.duplicate-argument",
                    format!("Duplicate argument '{}'", param.name),
                ));
            }
            let quantity = Quantity::from_name(&param.name).filter(|q| kind.accepts(*q));
            match (quantity, &param.default) {
                (Some(quantity), None) => requested.push(quantity),
                (Some(_), Some(_)) => {
                    return Err(self.signature_error(
                        kind,
                        "modifier.shadowed-argument",
                        format!(
                            "Argument '{}' is a physical quantity and cannot take a default",
                            param.name
                        ),
                    ));
                }
                (None, Some(value)) => extras.push((param.name.clone(), value.clone())),
                (None, None) => unexpected.push(param.name.as_str()),
            }
        }

        if !unexpected.is_empty() {
            let vocabulary = kind
                .vocabulary()
                .iter()
                .map(|q| q.name())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TbError::Signature(
                ErrorInfo::new(
                    "modifier.unexpected-argument",
                    format!(
                        "Unexpected argument(s) in {kind} modifier '{}': {}",
                        self.name,
                        unexpected.join(", ")
                    ),
                )
                .with_context("kind", kind)
                .with_context("modifier", self)
                .with_context("unexpected", unexpected.join(","))
                .with_hint(format!("expected a subset of: {vocabulary}")),
            ));
        }

        Ok(Introspection { requested, extras })
    }

    fn signature_error(&self, kind: ModifierKind, code: &str, message: String) -> TbError {
        TbError::Signature(
            ErrorInfo::new(code, message)
                .with_context("kind", kind)
                .with_context("modifier", self),
        )
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.display_name()))
    }
}
