//! Numeric element types used for Hamiltonian construction.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// One of the four numeric types a Hamiltonian can be assembled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericDType {
    /// Single precision real.
    Float32,
    /// Double precision real.
    Float64,
    /// Single precision complex (two `f32` components).
    Complex64,
    /// Double precision complex (two `f64` components).
    Complex128,
}

impl NumericDType {
    /// Builds the dtype from its complexity and precision flags.
    pub const fn from_flags(is_complex: bool, is_double: bool) -> Self {
        match (is_complex, is_double) {
            (false, false) => NumericDType::Float32,
            (false, true) => NumericDType::Float64,
            (true, false) => NumericDType::Complex64,
            (true, true) => NumericDType::Complex128,
        }
    }

    /// Returns whether the dtype is complex valued.
    pub const fn is_complex(self) -> bool {
        matches!(self, NumericDType::Complex64 | NumericDType::Complex128)
    }

    /// Returns whether the dtype uses double precision components.
    pub const fn is_double(self) -> bool {
        matches!(self, NumericDType::Float64 | NumericDType::Complex128)
    }

    /// Smallest dtype able to represent both operands without loss.
    pub const fn unify(self, other: NumericDType) -> NumericDType {
        NumericDType::from_flags(
            self.is_complex() || other.is_complex(),
            self.is_double() || other.is_double(),
        )
    }

    /// Same precision, complex valued.
    pub const fn to_complex(self) -> NumericDType {
        NumericDType::from_flags(true, self.is_double())
    }

    /// Same precision, real valued.
    pub const fn to_real(self) -> NumericDType {
        NumericDType::from_flags(false, self.is_double())
    }

    /// Same complexity, double precision.
    pub const fn to_double(self) -> NumericDType {
        NumericDType::from_flags(self.is_complex(), true)
    }

    /// Conventional lowercase name (`float32`, `complex128`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            NumericDType::Float32 => "float32",
            NumericDType::Float64 => "float64",
            NumericDType::Complex64 => "complex64",
            NumericDType::Complex128 => "complex128",
        }
    }
}

#[allow(clippy::derivable_impls)]
impl Default for NumericDType {
    fn default() -> Self {
        NumericDType::Float32
    }
}

impl Display for NumericDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a [`DynArray`](crate::DynArray).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Boolean flags (site state).
    Bool,
    /// Named integer labels (sublattice and hopping ids).
    Id,
    /// Numeric values.
    Numeric(NumericDType),
}

impl ElementType {
    /// Returns the numeric dtype if the element type is numeric.
    pub fn numeric(self) -> Option<NumericDType> {
        match self {
            ElementType::Numeric(dtype) => Some(dtype),
            _ => None,
        }
    }

    /// Returns whether the element type is complex numeric.
    pub fn is_complex(self) -> bool {
        self.numeric().map(NumericDType::is_complex).unwrap_or(false)
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Bool => f.write_str("bool"),
            ElementType::Id => f.write_str("id"),
            ElementType::Numeric(dtype) => dtype.fmt(f),
        }
    }
}
