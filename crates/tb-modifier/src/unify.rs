//! Reduces per-modifier precision and complexity flags to one dtype.

use serde::{Deserialize, Serialize};
use tb_core::NumericDType;

use crate::modifier::Modifier;

/// Static flags a modifier contributes to the pipeline dtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    /// The modifier produces complex values.
    pub is_complex: bool,
    /// The modifier requests double precision.
    pub is_double: bool,
}

impl CapabilityFlags {
    /// Flags of a registered modifier.
    pub fn of(modifier: &Modifier) -> Self {
        Self {
            is_complex: modifier.is_complex(),
            is_double: modifier.is_double(),
        }
    }

    /// Flags already implied by `dtype`.
    pub fn of_dtype(dtype: NumericDType) -> Self {
        Self {
            is_complex: dtype.is_complex(),
            is_double: dtype.is_double(),
        }
    }

    /// Element-wise OR.
    pub fn merge(self, other: Self) -> Self {
        Self {
            is_complex: self.is_complex || other.is_complex,
            is_double: self.is_double || other.is_double,
        }
    }

    /// The dtype these flags select.
    pub fn dtype(self) -> NumericDType {
        NumericDType::from_flags(self.is_complex, self.is_double)
    }
}

/// Folds `flags` into `base`.
pub fn unify_flags<I>(base: NumericDType, flags: I) -> NumericDType
where
    I: IntoIterator<Item = CapabilityFlags>,
{
    flags
        .into_iter()
        .fold(CapabilityFlags::of_dtype(base), CapabilityFlags::merge)
        .dtype()
}

/// Unified dtype for a model with base dtype `base` and the given modifiers.
///
/// Complex wins if the base or any modifier is complex; double wins if the
/// base or any modifier is double.
pub fn unify_dtype<'a, I>(base: NumericDType, modifiers: I) -> NumericDType
where
    I: IntoIterator<Item = &'a Modifier>,
{
    unify_flags(base, modifiers.into_iter().map(CapabilityFlags::of))
}
