//! Modifier registration, invocation and canonical descriptors.

use std::fmt::{self, Display};
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tb_core::errors::{ErrorInfo, TbError};
use tb_core::{sample_uniform, stable_hash_string, DynArray, IdArray, NumericDType};

use crate::binder::{Argument, Binding, ModifierArgs};
use crate::quantity::{ModifierKind, Quantity};
use crate::signature::{BoundValue, Signature};
use crate::sites::{Sites, SpatialIndex};
use crate::validate::{validate_return, ReturnContract};

/// Batch length used for the registration probe.
pub const PROBE_LEN: usize = 10;
const PROBE_SEED: u64 = 0x5EED_0F_7B;

/// Arrays returned by a modifier body.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierReturn(Vec<DynArray>);

impl ModifierReturn {
    /// Returned arrays in order.
    pub fn arrays(&self) -> &[DynArray] {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_arrays(self) -> Vec<DynArray> {
        self.0
    }

    /// Number of returned arrays.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was returned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<DynArray> for ModifierReturn {
    fn from(value: DynArray) -> Self {
        Self(vec![value])
    }
}

impl<T> From<Array1<T>> for ModifierReturn
where
    DynArray: From<Array1<T>>,
{
    fn from(value: Array1<T>) -> Self {
        Self(vec![DynArray::from(value)])
    }
}

impl From<Vec<DynArray>> for ModifierReturn {
    fn from(value: Vec<DynArray>) -> Self {
        Self(value)
    }
}

impl From<(DynArray, DynArray)> for ModifierReturn {
    fn from((a, b): (DynArray, DynArray)) -> Self {
        Self(vec![a, b])
    }
}

impl From<(DynArray, DynArray, DynArray)> for ModifierReturn {
    fn from((a, b, c): (DynArray, DynArray, DynArray)) -> Self {
        Self(vec![a, b, c])
    }
}

/// Type-erased modifier body.
pub type ModifierFn =
    Arc<dyn Fn(&ModifierArgs<'_>) -> Result<ModifierReturn, TbError> + Send + Sync>;

/// Keyword configuration accepted at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierOptions {
    /// Force double precision for the whole model.
    #[serde(default)]
    pub double: bool,
    /// Declare the modifier complex-capable.
    #[serde(default)]
    pub complex: bool,
}

impl ModifierOptions {
    /// Sets the `double` flag.
    pub fn double(mut self, double: bool) -> Self {
        self.double = double;
        self
    }

    /// Sets the `complex` flag.
    pub fn complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }
}

/// Immutable record created at registration.
pub struct ModifierSpec {
    kind: ModifierKind,
    signature: Signature,
    requested: Vec<Quantity>,
    binding: Binding,
    extras: Vec<(String, BoundValue)>,
    func: ModifierFn,
    is_complex: bool,
    is_double: bool,
}

impl fmt::Debug for ModifierSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierSpec")
            .field("kind", &self.kind)
            .field("signature", &self.signature)
            .field("requested", &self.requested)
            .field("is_complex", &self.is_complex)
            .field("is_double", &self.is_double)
            .finish_non_exhaustive()
    }
}

impl ModifierSpec {
    fn invoke(
        &self,
        full: &[DynArray],
        sites: Option<&dyn SpatialIndex>,
        complex_capable: bool,
        check_finite: bool,
    ) -> Result<Vec<DynArray>, TbError> {
        check_batch(self.kind, full).map_err(|err| self.annotate(err))?;
        let derived;
        let sites = match sites {
            Some(sites) => Some(sites),
            None if self.binding.needs_sites() => {
                derived = derive_sites(self.kind, full)?;
                Some(&derived as &dyn SpatialIndex)
            }
            None => None,
        };
        let values = self
            .binding
            .select(full, sites)
            .map_err(|err| self.annotate(err))?;
        let args = ModifierArgs::new(&self.requested, values, &self.extras);
        let returned = (self.func)(&args)
            .map_err(|err| self.annotate(err))?
            .into_arrays();

        let name = self.signature.to_string();
        let contract = ReturnContract {
            kind: self.kind,
            name: &name,
            complex_capable,
            check_finite,
        };
        let inputs = self.replaced_inputs(full)?;
        validate_return(&contract, &inputs, &returned)?;
        Ok(returned)
    }

    fn replaced_inputs<'a>(&self, full: &'a [DynArray]) -> Result<Vec<&'a DynArray>, TbError> {
        let kind = self.kind;
        kind.replaces()
            .iter()
            .map(|quantity| {
                kind.slot_of(*quantity)
                    .and_then(|slot| full.get(slot))
                    .ok_or_else(|| {
                        self.annotate(TbError::Binding(ErrorInfo::new(
                            "binding.apply-arity",
                            format!(
                                "{kind} modifiers are applied with {} arrays, got {}",
                                kind.positional().len(),
                                full.len()
                            ),
                        )))
                    })
            })
            .collect()
    }

    fn annotate(&self, err: TbError) -> TbError {
        if err.info().context.contains_key("modifier") {
            return err;
        }
        err.with_context("modifier", &self.signature)
            .with_context("kind", self.kind)
    }
}

/// Serializable summary of a registered modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDescriptor {
    /// Modifier kind.
    pub kind: ModifierKind,
    /// Short canonical signature.
    pub name: String,
    /// Qualified canonical signature.
    pub repr: String,
    /// Requested quantities in declaration order.
    pub requested: Vec<Quantity>,
    /// Whether the modifier produces complex values.
    pub is_complex: bool,
    /// Whether the modifier requests double precision.
    pub is_double: bool,
}

impl ModifierDescriptor {
    /// SHA-256 of the canonical JSON encoding.
    pub fn cache_key(&self) -> Result<String, TbError> {
        stable_hash_string(self)
    }
}

/// A validated, registered modifier. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Modifier {
    spec: Arc<ModifierSpec>,
}

impl Modifier {
    /// Modifier kind.
    pub fn kind(&self) -> ModifierKind {
        self.spec.kind
    }

    /// Declared signature.
    pub fn signature(&self) -> &Signature {
        &self.spec.signature
    }

    /// Requested quantities in declaration order.
    pub fn requested(&self) -> &[Quantity] {
        &self.spec.requested
    }

    /// Defaulted parameters in declaration order.
    pub fn extras(&self) -> &[(String, BoundValue)] {
        &self.spec.extras
    }

    /// Whether the modifier produces complex values.
    pub fn is_complex(&self) -> bool {
        self.spec.is_complex
    }

    /// Whether the modifier requests double precision.
    pub fn is_double(&self) -> bool {
        self.spec.is_double
    }

    /// Whether the body reads the spatial index.
    pub fn needs_sites(&self) -> bool {
        self.spec.binding.needs_sites()
    }

    /// Qualified canonical signature, e.g. `outer.<locals>.factory(a=1)`.
    pub fn repr(&self) -> String {
        self.spec.signature.repr()
    }

    /// Serializable summary used for caching and reports.
    pub fn descriptor(&self) -> ModifierDescriptor {
        ModifierDescriptor {
            kind: self.kind(),
            name: self.to_string(),
            repr: self.repr(),
            requested: self.spec.requested.clone(),
            is_complex: self.is_complex(),
            is_double: self.is_double(),
        }
    }

    /// Invokes the body with exactly the declared arguments, in declared
    /// order. The output is returned as produced, without validation or casts.
    pub fn call(&self, args: &[Argument<'_>]) -> Result<ModifierReturn, TbError> {
        self.spec
            .binding
            .check_call(args)
            .map_err(|err| self.annotate(err))?;
        let args = ModifierArgs::new(&self.spec.requested, args.to_vec(), &self.spec.extras);
        (self.spec.func)(&args).map_err(|err| self.annotate(err))
    }

    /// Invokes the body with the kind's full positional list, validates the
    /// output and casts it to the pipeline dtype.
    ///
    /// `sites` is built from the position arrays when the modifier declares it.
    pub fn apply(&self, full: &[DynArray]) -> Result<Vec<DynArray>, TbError> {
        self.apply_with_sites(full, None)
    }

    /// Like [`Modifier::apply`] with an externally supplied spatial index.
    pub fn apply_with_sites(
        &self,
        full: &[DynArray],
        sites: Option<&dyn SpatialIndex>,
    ) -> Result<Vec<DynArray>, TbError> {
        let spec = &self.spec;
        let replaced = spec.replaced_inputs(full)?;
        let capable = match spec.kind {
            ModifierKind::OnsiteEnergy | ModifierKind::HoppingEnergy => {
                spec.is_complex || spec.kind.complex_by_default() || replaced[0].is_complex()
            }
            _ => false,
        };
        let outputs = spec.invoke(full, sites, capable, true)?;
        outputs
            .into_iter()
            .zip(replaced)
            .map(|(output, input)| self.cast_like(output, input))
            .collect()
    }

    /// Casts a validated output to the dtype of the input it replaces,
    /// promoted to complex for complex output and to double for `double`
    /// modifiers.
    fn cast_like(&self, output: DynArray, input: &DynArray) -> Result<DynArray, TbError> {
        let Some(base) = input.numeric_dtype() else {
            return Ok(output);
        };
        let mut target = base;
        if output.is_complex() {
            target = target.to_complex();
        }
        if self.is_double() {
            target = target.to_double();
        }
        output.cast(target).map_err(|err| self.annotate(err))
    }

    fn annotate(&self, err: TbError) -> TbError {
        self.spec.annotate(err)
    }
}

impl Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.spec.signature.fmt(f)
    }
}

fn check_batch(kind: ModifierKind, full: &[DynArray]) -> Result<(), TbError> {
    let expected = kind.positional().len();
    if full.len() != expected {
        return Err(TbError::Binding(ErrorInfo::new(
            "binding.apply-arity",
            format!("{kind} modifiers are applied with {expected} arrays, got {}", full.len()),
        )));
    }
    let len = full.first().map(DynArray::len).unwrap_or(0);
    if full.iter().any(|array| array.len() != len) {
        let lengths = full
            .iter()
            .map(|array| array.len().to_string())
            .collect::<Vec<_>>()
            .join(",");
        return Err(TbError::Binding(
            ErrorInfo::new("binding.ragged-batch", "batch arrays differ in length")
                .with_context("lengths", lengths),
        ));
    }
    Ok(())
}

fn derive_sites(kind: ModifierKind, full: &[DynArray]) -> Result<Sites, TbError> {
    let slot = |quantity| {
        kind.slot_of(quantity).and_then(|index| full.get(index)).ok_or_else(|| {
            TbError::Binding(ErrorInfo::new(
                "binding.missing-sites",
                format!("{kind} modifiers cannot derive a spatial index"),
            ))
        })
    };
    let sub_id = slot(Quantity::SubId).ok();
    Sites::from_arrays(
        slot(Quantity::X)?,
        slot(Quantity::Y)?,
        slot(Quantity::Z)?,
        sub_id,
    )
}

/// Deterministic sample arrays for the probe, in the kind's positional order.
fn probe_inputs(kind: ModifierKind, dtype: NumericDType) -> Vec<DynArray> {
    kind.positional()
        .iter()
        .enumerate()
        .map(|(slot, quantity)| match quantity {
            Quantity::State => DynArray::Bool(Array1::from_elem(PROBE_LEN, true)),
            Quantity::SubId | Quantity::HopId => {
                DynArray::Id(IdArray::permissive(Array1::zeros(PROBE_LEN)))
            }
            _ => {
                let values = sample_uniform(PROBE_SEED, slot as u64, PROBE_LEN, -1.0, 1.0);
                DynArray::from_reals(dtype, values.as_slice().unwrap_or(&[]))
            }
        })
        .collect()
}

fn register(
    kind: ModifierKind,
    options: ModifierOptions,
    signature: Signature,
    func: ModifierFn,
) -> Result<Modifier, TbError> {
    let introspection = signature.introspect(kind)?;
    let binding = Binding::new(kind, &introspection.requested)?;
    let mut spec = ModifierSpec {
        kind,
        signature,
        requested: introspection.requested,
        binding,
        extras: introspection.extras,
        func,
        is_complex: options.complex,
        is_double: options.double,
    };

    // The probe is the modifier's first invocation: contract violations
    // surface here, before the modifier can be attached to a model.
    // Sample data may sit outside the body's domain, so finiteness is only
    // checked on real batches.
    let dtype = NumericDType::from_flags(false, options.double);
    let capable = options.complex || kind.complex_by_default();
    let outputs = spec.invoke(&probe_inputs(kind, dtype), None, capable, false)?;
    spec.is_complex = options.complex || outputs.iter().any(DynArray::is_complex);

    let modifier = Modifier {
        spec: Arc::new(spec),
    };
    log::debug!(
        "registered {kind} modifier {} (requested: {:?}, complex: {}, double: {})",
        modifier.repr(),
        modifier.requested(),
        modifier.is_complex(),
        modifier.is_double()
    );
    Ok(modifier)
}

/// Registration entry point configured with [`ModifierOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decorator {
    kind: ModifierKind,
    options: ModifierOptions,
}

impl Decorator {
    /// Creates a decorator for `kind`.
    pub fn new(kind: ModifierKind, options: ModifierOptions) -> Self {
        Self { kind, options }
    }

    /// Kind the decorator registers.
    pub fn kind(&self) -> ModifierKind {
        self.kind
    }

    /// Options applied to every registration.
    pub fn options(&self) -> ModifierOptions {
        self.options
    }

    /// Validates `signature`, probes `func` and returns the registered modifier.
    pub fn wrap<F, R>(self, signature: Signature, func: F) -> Result<Modifier, TbError>
    where
        F: Fn(&ModifierArgs<'_>) -> Result<R, TbError> + Send + Sync + 'static,
        R: Into<ModifierReturn>,
    {
        let func: ModifierFn = Arc::new(move |args| func(args).map(Into::into));
        register(self.kind, self.options, signature, func)
    }
}

/// Registers an onsite-energy modifier.
pub fn onsite_energy_modifier<F, R>(signature: Signature, func: F) -> Result<Modifier, TbError>
where
    F: Fn(&ModifierArgs<'_>) -> Result<R, TbError> + Send + Sync + 'static,
    R: Into<ModifierReturn>,
{
    onsite_energy_modifier_with(ModifierOptions::default()).wrap(signature, func)
}

/// Onsite-energy registration with explicit options.
pub fn onsite_energy_modifier_with(options: ModifierOptions) -> Decorator {
    Decorator::new(ModifierKind::OnsiteEnergy, options)
}

/// Registers a hopping-energy modifier.
pub fn hopping_energy_modifier<F, R>(signature: Signature, func: F) -> Result<Modifier, TbError>
where
    F: Fn(&ModifierArgs<'_>) -> Result<R, TbError> + Send + Sync + 'static,
    R: Into<ModifierReturn>,
{
    hopping_energy_modifier_with(ModifierOptions::default()).wrap(signature, func)
}

/// Hopping-energy registration with explicit options.
pub fn hopping_energy_modifier_with(options: ModifierOptions) -> Decorator {
    Decorator::new(ModifierKind::HoppingEnergy, options)
}

/// Registers a site-position modifier.
pub fn site_position_modifier<F, R>(signature: Signature, func: F) -> Result<Modifier, TbError>
where
    F: Fn(&ModifierArgs<'_>) -> Result<R, TbError> + Send + Sync + 'static,
    R: Into<ModifierReturn>,
{
    site_position_modifier_with(ModifierOptions::default()).wrap(signature, func)
}

/// Site-position registration with explicit options.
pub fn site_position_modifier_with(options: ModifierOptions) -> Decorator {
    Decorator::new(ModifierKind::SitePosition, options)
}

/// Registers a site-state modifier.
pub fn site_state_modifier<F, R>(signature: Signature, func: F) -> Result<Modifier, TbError>
where
    F: Fn(&ModifierArgs<'_>) -> Result<R, TbError> + Send + Sync + 'static,
    R: Into<ModifierReturn>,
{
    site_state_modifier_with(ModifierOptions::default()).wrap(signature, func)
}

/// Site-state registration with explicit options.
pub fn site_state_modifier_with(options: ModifierOptions) -> Decorator {
    Decorator::new(ModifierKind::SiteState, options)
}
