//! Sparse Hamiltonian in coordinate form.

use ndarray::Array2;
use num_complex::Complex64;
use tb_core::errors::{ErrorInfo, TbError};
use tb_core::{DynArray, NumericDType};

/// Hermitian matrix stored as `(row, col, value)` triplets in the model's
/// unified dtype. Duplicate coordinates add up.
#[derive(Debug, Clone, PartialEq)]
pub struct Hamiltonian {
    dtype: NumericDType,
    size: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: DynArray,
}

impl Hamiltonian {
    /// Assembles the matrix from onsite energies (one per row) and bonds
    /// between rows. Each bond contributes its value and the conjugate.
    pub(crate) fn assemble(
        dtype: NumericDType,
        onsite: &DynArray,
        bonds: &[(usize, usize)],
        hopping: &DynArray,
    ) -> Result<Self, TbError> {
        if bonds.len() != hopping.len() {
            return Err(TbError::Model(
                ErrorInfo::new("model.hopping-length", "one hopping energy per bond expected")
                    .with_context("bonds", bonds.len())
                    .with_context("energies", hopping.len()),
            ));
        }
        let size = onsite.len();
        let capacity = size + 2 * bonds.len();
        let mut rows = Vec::with_capacity(capacity);
        let mut cols = Vec::with_capacity(capacity);
        let mut values = Vec::with_capacity(capacity);

        for (row, energy) in onsite.to_c64().iter().enumerate() {
            rows.push(row);
            cols.push(row);
            values.push(*energy);
        }
        for ((i, j), energy) in bonds.iter().zip(hopping.to_c64().iter()) {
            if *i >= size || *j >= size {
                return Err(TbError::Model(
                    ErrorInfo::new("model.bond-out-of-range", "bond refers to a missing row")
                        .with_context("bond", format!("({i}, {j})"))
                        .with_context("size", size),
                ));
            }
            rows.extend([*i, *j]);
            cols.extend([*j, *i]);
            values.extend([*energy, energy.conj()]);
        }

        Ok(Self {
            dtype,
            size,
            rows,
            cols,
            values: DynArray::from_complex(dtype, &values)?,
        })
    }

    /// Element type of the stored values.
    pub fn dtype(&self) -> NumericDType {
        self.dtype
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    /// Row coordinates.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Column coordinates.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Stored values.
    pub fn values(&self) -> &DynArray {
        &self.values
    }

    /// Sum of the triplets at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        let values = self.values.to_c64();
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(values.iter())
            .filter(|((r, c), _)| **r == row && **c == col)
            .map(|(_, value)| *value)
            .sum()
    }

    /// Dense double precision copy.
    pub fn to_dense(&self) -> Array2<Complex64> {
        let mut dense = Array2::zeros((self.size, self.size));
        for ((row, col), value) in self.rows.iter().zip(&self.cols).zip(self.values.to_c64()) {
            dense[[*row, *col]] += value;
        }
        dense
    }

    /// Whether `H == H^dagger` within `tolerance`.
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        let dense = self.to_dense();
        dense
            .indexed_iter()
            .all(|((i, j), value)| (value - dense[[j, i]].conj()).norm() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn bonds_are_mirrored_with_conjugate_values() {
        let onsite = DynArray::F64(array![0.5, -0.5]);
        let hopping = DynArray::C128(array![Complex64::new(1.0, 2.0)]);
        let h = Hamiltonian::assemble(NumericDType::Complex128, &onsite, &[(0, 1)], &hopping)
            .unwrap();
        assert_eq!(h.nnz(), 4);
        assert_eq!(h.get(1, 0), Complex64::new(1.0, -2.0));
        assert!(h.is_hermitian(0.0));
    }

    #[test]
    fn real_dtype_refuses_complex_values() {
        let onsite = DynArray::F32(array![0.0, 0.0]);
        let hopping = DynArray::C64(array![num_complex::Complex32::new(0.0, 1.0)]);
        let err = Hamiltonian::assemble(NumericDType::Float32, &onsite, &[(0, 1)], &hopping)
            .unwrap_err();
        assert!(matches!(err, TbError::Complexity(_)));
    }
}
