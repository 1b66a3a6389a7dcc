//! Dynamically typed one dimensional arrays exchanged with modifiers.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::Array1;
use num_complex::{Complex32, Complex64};

use crate::dtype::{ElementType, NumericDType};
use crate::errors::{ErrorInfo, TbError};

/// Integer labels paired with the name table they were drawn from.
///
/// Sublattice and hopping ids are handed to modifiers as `IdArray`s so a
/// modifier can select sites by name (`sub_id.eq_name("A")`) without knowing
/// the numeric id the lattice assigned.
///
/// A permissive array (see [`IdArray::permissive`]) resolves names missing
/// from its table to an id no entry carries, so lookups yield all-false masks
/// instead of errors. Registration probes use it because the lattice the
/// modifier will eventually run against is not known yet.
#[derive(Debug, Clone, PartialEq)]
pub struct IdArray {
    ids: Array1<u16>,
    names: Arc<BTreeMap<String, u16>>,
    permissive: bool,
}

/// Id reported by permissive arrays for names outside their table.
pub const UNMATCHED_ID: u16 = u16::MAX;

impl IdArray {
    /// Creates an id array backed by the provided name table.
    pub fn new(ids: Array1<u16>, names: Arc<BTreeMap<String, u16>>) -> Self {
        Self {
            ids,
            names,
            permissive: false,
        }
    }

    /// Creates an id array whose unknown-name lookups never fail.
    pub fn permissive(ids: Array1<u16>) -> Self {
        Self {
            ids,
            names: Arc::new(BTreeMap::new()),
            permissive: true,
        }
    }

    /// Raw ids.
    pub fn ids(&self) -> &Array1<u16> {
        &self.ids
    }

    /// Name table shared with the owning lattice.
    pub fn names(&self) -> &Arc<BTreeMap<String, u16>> {
        &self.names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolves a name to its id.
    pub fn id_of(&self, name: &str) -> Result<u16, TbError> {
        if let Some(id) = self.names.get(name) {
            return Ok(*id);
        }
        if self.permissive {
            return Ok(UNMATCHED_ID);
        }
        let known = self.names.keys().cloned().collect::<Vec<_>>().join(",");
        Err(TbError::Lattice(
            ErrorInfo::new("lattice.unknown-name", format!("unknown name '{name}'"))
                .with_context("known", known),
        ))
    }

    /// Mask of entries labelled `name`.
    pub fn eq_name(&self, name: &str) -> Result<Array1<bool>, TbError> {
        let id = self.id_of(name)?;
        Ok(self.eq_id(id))
    }

    /// Mask of entries not labelled `name`.
    pub fn ne_name(&self, name: &str) -> Result<Array1<bool>, TbError> {
        let id = self.id_of(name)?;
        Ok(self.ids.mapv(|value| value != id))
    }

    /// Mask of entries equal to the raw id.
    pub fn eq_id(&self, id: u16) -> Array1<bool> {
        self.ids.mapv(|value| value == id)
    }

    /// Returns a copy with the same name table and new ids.
    pub fn with_ids(&self, ids: Array1<u16>) -> Self {
        Self {
            ids,
            names: Arc::clone(&self.names),
            permissive: self.permissive,
        }
    }
}

/// A one dimensional array with a runtime element type.
#[derive(Debug, Clone, PartialEq)]
pub enum DynArray {
    /// Boolean flags.
    Bool(Array1<bool>),
    /// Named integer labels.
    Id(IdArray),
    /// Single precision reals.
    F32(Array1<f32>),
    /// Double precision reals.
    F64(Array1<f64>),
    /// Single precision complex numbers.
    C64(Array1<Complex32>),
    /// Double precision complex numbers.
    C128(Array1<Complex64>),
}

fn type_error(message: impl Into<String>) -> TbError {
    TbError::ReturnType(ErrorInfo::new("array.element-type", message))
}

impl DynArray {
    /// Array of zeros in the requested dtype.
    pub fn zeros(dtype: NumericDType, len: usize) -> Self {
        Self::filled(dtype, len, 0.0)
    }

    /// Array of ones in the requested dtype.
    pub fn ones(dtype: NumericDType, len: usize) -> Self {
        Self::filled(dtype, len, 1.0)
    }

    /// Array with every entry set to the real value `value`.
    pub fn filled(dtype: NumericDType, len: usize, value: f64) -> Self {
        match dtype {
            NumericDType::Float32 => DynArray::F32(Array1::from_elem(len, value as f32)),
            NumericDType::Float64 => DynArray::F64(Array1::from_elem(len, value)),
            NumericDType::Complex64 => {
                DynArray::C64(Array1::from_elem(len, Complex32::new(value as f32, 0.0)))
            }
            NumericDType::Complex128 => {
                DynArray::C128(Array1::from_elem(len, Complex64::new(value, 0.0)))
            }
        }
    }

    /// Builds an array of the requested dtype from double precision reals.
    pub fn from_reals(dtype: NumericDType, values: &[f64]) -> Self {
        let wide = Array1::from_vec(values.to_vec());
        match dtype {
            NumericDType::Float32 => DynArray::F32(wide.mapv(|v| v as f32)),
            NumericDType::Float64 => DynArray::F64(wide),
            NumericDType::Complex64 => {
                DynArray::C64(wide.mapv(|v| Complex32::new(v as f32, 0.0)))
            }
            NumericDType::Complex128 => DynArray::C128(wide.mapv(|v| Complex64::new(v, 0.0))),
        }
    }

    /// Builds an array of the requested dtype from double precision complex values.
    ///
    /// Fails if `dtype` is real and any value has a non-zero imaginary part.
    pub fn from_complex(dtype: NumericDType, values: &[Complex64]) -> Result<Self, TbError> {
        let array = DynArray::C128(Array1::from_vec(values.to_vec()));
        if dtype.is_complex() {
            return array.cast(dtype);
        }
        if values.iter().any(|value| value.im != 0.0) {
            return Err(TbError::Complexity(ErrorInfo::new(
                "array.complex-to-real",
                "complex values cannot be stored in a real array",
            )));
        }
        DynArray::F64(values.iter().map(|value| value.re).collect()).cast(dtype)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            DynArray::Bool(a) => a.len(),
            DynArray::Id(a) => a.len(),
            DynArray::F32(a) => a.len(),
            DynArray::F64(a) => a.len(),
            DynArray::C64(a) => a.len(),
            DynArray::C128(a) => a.len(),
        }
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of the array (always one dimensional).
    pub fn shape(&self) -> &[usize] {
        match self {
            DynArray::Bool(a) => a.shape(),
            DynArray::Id(a) => a.ids().shape(),
            DynArray::F32(a) => a.shape(),
            DynArray::F64(a) => a.shape(),
            DynArray::C64(a) => a.shape(),
            DynArray::C128(a) => a.shape(),
        }
    }

    /// Runtime element type.
    pub fn element_type(&self) -> ElementType {
        match self {
            DynArray::Bool(_) => ElementType::Bool,
            DynArray::Id(_) => ElementType::Id,
            DynArray::F32(_) => ElementType::Numeric(NumericDType::Float32),
            DynArray::F64(_) => ElementType::Numeric(NumericDType::Float64),
            DynArray::C64(_) => ElementType::Numeric(NumericDType::Complex64),
            DynArray::C128(_) => ElementType::Numeric(NumericDType::Complex128),
        }
    }

    /// Numeric dtype, or `None` for boolean and id arrays.
    pub fn numeric_dtype(&self) -> Option<NumericDType> {
        self.element_type().numeric()
    }

    /// Whether the array holds complex numbers.
    pub fn is_complex(&self) -> bool {
        matches!(self, DynArray::C64(_) | DynArray::C128(_))
    }

    /// Boolean view, if the array holds flags.
    pub fn as_bool(&self) -> Option<&Array1<bool>> {
        match self {
            DynArray::Bool(a) => Some(a),
            _ => None,
        }
    }

    /// Id view, if the array holds labels.
    pub fn as_id(&self) -> Option<&IdArray> {
        match self {
            DynArray::Id(a) => Some(a),
            _ => None,
        }
    }

    /// Widens every entry to a double precision complex number.
    pub fn to_c64(&self) -> Array1<Complex64> {
        match self {
            DynArray::Bool(a) => a.mapv(|v| Complex64::new(if v { 1.0 } else { 0.0 }, 0.0)),
            DynArray::Id(a) => a.ids().mapv(|v| Complex64::new(f64::from(v), 0.0)),
            DynArray::F32(a) => a.mapv(|v| Complex64::new(f64::from(v), 0.0)),
            DynArray::F64(a) => a.mapv(|v| Complex64::new(v, 0.0)),
            DynArray::C64(a) => a.mapv(|v| Complex64::new(f64::from(v.re), f64::from(v.im))),
            DynArray::C128(a) => a.clone(),
        }
    }

    /// Widens every entry to a double precision real.
    ///
    /// Complex arrays are rejected even when every imaginary part is zero.
    pub fn to_f64(&self) -> Result<Array1<f64>, TbError> {
        match self {
            DynArray::Bool(a) => Ok(a.mapv(|v| if v { 1.0 } else { 0.0 })),
            DynArray::Id(a) => Ok(a.ids().mapv(f64::from)),
            DynArray::F32(a) => Ok(a.mapv(f64::from)),
            DynArray::F64(a) => Ok(a.clone()),
            DynArray::C64(_) | DynArray::C128(_) => Err(TbError::Complexity(ErrorInfo::new(
                "array.complex-to-real",
                "complex array cannot be viewed as real",
            ))),
        }
    }

    /// Converts to the requested numeric dtype.
    ///
    /// Boolean and id arrays widen to `0`/`1` and the raw id respectively.
    /// Complex to real conversions are refused rather than truncated.
    pub fn cast(&self, dtype: NumericDType) -> Result<DynArray, TbError> {
        if self.numeric_dtype() == Some(dtype) {
            return Ok(self.clone());
        }
        if dtype.is_complex() {
            let wide = self.to_c64();
            return Ok(match dtype {
                NumericDType::Complex64 => DynArray::C64(
                    wide.mapv(|v| Complex32::new(v.re as f32, v.im as f32)),
                ),
                _ => DynArray::C128(wide),
            });
        }
        let wide = self.to_f64().map_err(|_| {
            TbError::Complexity(
                ErrorInfo::new(
                    "array.complex-to-real",
                    "complex values would be truncated to real",
                )
                .with_context("target", dtype),
            )
        })?;
        Ok(match dtype {
            NumericDType::Float32 => DynArray::F32(wide.mapv(|v| v as f32)),
            _ => DynArray::F64(wide),
        })
    }

    /// Whether every numeric entry is finite. Boolean and id arrays always are.
    pub fn all_finite(&self) -> bool {
        match self {
            DynArray::Bool(_) | DynArray::Id(_) => true,
            DynArray::F32(a) => a.iter().all(|v| v.is_finite()),
            DynArray::F64(a) => a.iter().all(|v| v.is_finite()),
            DynArray::C64(a) => a.iter().all(|v| v.re.is_finite() && v.im.is_finite()),
            DynArray::C128(a) => a.iter().all(|v| v.re.is_finite() && v.im.is_finite()),
        }
    }

    /// Adds a real scalar, keeping the dtype.
    pub fn add_scalar(&self, delta: f64) -> Result<DynArray, TbError> {
        match self {
            DynArray::F32(a) => Ok(DynArray::F32(a.mapv(|v| v + delta as f32))),
            DynArray::F64(a) => Ok(DynArray::F64(a.mapv(|v| v + delta))),
            DynArray::C64(a) => Ok(DynArray::C64(a.mapv(|v| v + delta as f32))),
            DynArray::C128(a) => Ok(DynArray::C128(a.mapv(|v| v + delta))),
            other => Err(type_error(format!(
                "cannot add a scalar to a {} array",
                other.element_type()
            ))),
        }
    }

    /// Multiplies by a real scalar, keeping the dtype.
    pub fn mul_scalar(&self, factor: f64) -> Result<DynArray, TbError> {
        match self {
            DynArray::F32(a) => Ok(DynArray::F32(a.mapv(|v| v * factor as f32))),
            DynArray::F64(a) => Ok(DynArray::F64(a.mapv(|v| v * factor))),
            DynArray::C64(a) => Ok(DynArray::C64(a.mapv(|v| v * factor as f32))),
            DynArray::C128(a) => Ok(DynArray::C128(a.mapv(|v| v * factor))),
            other => Err(type_error(format!(
                "cannot scale a {} array",
                other.element_type()
            ))),
        }
    }

    /// Multiplies by a complex scalar; the result is complex at the input's precision.
    pub fn mul_complex(&self, factor: Complex64) -> Result<DynArray, TbError> {
        let dtype = self.numeric_dtype().ok_or_else(|| {
            type_error(format!("cannot scale a {} array", self.element_type()))
        })?;
        match self.cast(dtype.to_complex())? {
            DynArray::C64(a) => {
                let factor = Complex32::new(factor.re as f32, factor.im as f32);
                Ok(DynArray::C64(a.mapv(|v| v * factor)))
            }
            DynArray::C128(a) => Ok(DynArray::C128(a.mapv(|v| v * factor))),
            other => Err(type_error(format!(
                "cannot scale a {} array",
                other.element_type()
            ))),
        }
    }

    /// Applies `f` to every real entry, keeping the dtype.
    pub fn map_real(&self, f: impl Fn(f64) -> f64) -> Result<DynArray, TbError> {
        match self {
            DynArray::F32(a) => Ok(DynArray::F32(a.mapv(|v| f(f64::from(v)) as f32))),
            DynArray::F64(a) => Ok(DynArray::F64(a.mapv(f))),
            other => Err(type_error(format!(
                "map_real needs a real array, got {}",
                other.element_type()
            ))),
        }
    }

    /// Array of the same element type and length filled with "one"
    /// (`true` for flags).
    pub fn ones_like(&self) -> DynArray {
        match self {
            DynArray::Bool(a) => DynArray::Bool(Array1::from_elem(a.len(), true)),
            DynArray::Id(a) => DynArray::Id(a.with_ids(Array1::from_elem(a.len(), 1))),
            other => {
                let dtype = other.numeric_dtype().unwrap_or_default();
                DynArray::ones(dtype, other.len())
            }
        }
    }

    /// Array of the same element type and length filled with "zero"
    /// (`false` for flags).
    pub fn zeros_like(&self) -> DynArray {
        match self {
            DynArray::Bool(a) => DynArray::Bool(Array1::from_elem(a.len(), false)),
            DynArray::Id(a) => DynArray::Id(a.with_ids(Array1::zeros(a.len()))),
            other => {
                let dtype = other.numeric_dtype().unwrap_or_default();
                DynArray::zeros(dtype, other.len())
            }
        }
    }
}

impl From<Array1<bool>> for DynArray {
    fn from(value: Array1<bool>) -> Self {
        DynArray::Bool(value)
    }
}

impl From<IdArray> for DynArray {
    fn from(value: IdArray) -> Self {
        DynArray::Id(value)
    }
}

impl From<Array1<f32>> for DynArray {
    fn from(value: Array1<f32>) -> Self {
        DynArray::F32(value)
    }
}

impl From<Array1<f64>> for DynArray {
    fn from(value: Array1<f64>) -> Self {
        DynArray::F64(value)
    }
}

impl From<Array1<Complex32>> for DynArray {
    fn from(value: Array1<Complex32>) -> Self {
        DynArray::C64(value)
    }
}

impl From<Array1<Complex64>> for DynArray {
    fn from(value: Array1<Complex64>) -> Self {
        DynArray::C128(value)
    }
}
