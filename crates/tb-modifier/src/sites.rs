//! Spatial index handed to modifiers that declare the `sites` parameter.

use std::fmt;

use ndarray::Array1;
use tb_core::errors::{ErrorInfo, TbError};
use tb_core::{DynArray, IdArray};

/// Nearest-neighbour queries over a batch of site positions.
pub trait SpatialIndex: fmt::Debug + Send + Sync {
    /// Number of indexed sites.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Permutation of site indices ordered by ascending distance to
    /// `reference`. Missing trailing components of `reference` are zero.
    fn argsort_nearest(&self, reference: &[f64]) -> Vec<usize>;

    /// Index of the site closest to `reference`.
    fn find_nearest(&self, reference: &[f64]) -> Option<usize> {
        self.argsort_nearest(reference).first().copied()
    }
}

/// Brute force index over explicit coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Sites {
    x: Array1<f64>,
    y: Array1<f64>,
    z: Array1<f64>,
    sub_id: Option<IdArray>,
}

impl Sites {
    /// Creates an index from coordinate arrays of equal length.
    pub fn new(x: Array1<f64>, y: Array1<f64>, z: Array1<f64>) -> Result<Self, TbError> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(TbError::Binding(
                ErrorInfo::new("sites.length-mismatch", "coordinate arrays differ in length")
                    .with_context("x", x.len())
                    .with_context("y", y.len())
                    .with_context("z", z.len()),
            ));
        }
        Ok(Self {
            x,
            y,
            z,
            sub_id: None,
        })
    }

    /// Creates an index from the batch arrays a modifier would receive.
    pub fn from_arrays(
        x: &DynArray,
        y: &DynArray,
        z: &DynArray,
        sub_id: Option<&DynArray>,
    ) -> Result<Self, TbError> {
        let mut sites = Self::new(x.to_f64()?, y.to_f64()?, z.to_f64()?)?;
        sites.sub_id = sub_id.and_then(DynArray::as_id).cloned();
        Ok(sites)
    }

    /// Attaches sublattice ids.
    pub fn with_sub_id(mut self, sub_id: IdArray) -> Self {
        self.sub_id = Some(sub_id);
        self
    }

    /// X coordinates.
    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    /// Y coordinates.
    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    /// Z coordinates.
    pub fn z(&self) -> &Array1<f64> {
        &self.z
    }

    /// Sublattice ids, when known.
    pub fn sub_id(&self) -> Option<&IdArray> {
        self.sub_id.as_ref()
    }

    fn distance_squared(&self, index: usize, reference: [f64; 3]) -> f64 {
        let dx = self.x[index] - reference[0];
        let dy = self.y[index] - reference[1];
        let dz = self.z[index] - reference[2];
        dx * dx + dy * dy + dz * dz
    }
}

impl SpatialIndex for Sites {
    fn len(&self) -> usize {
        self.x.len()
    }

    fn argsort_nearest(&self, reference: &[f64]) -> Vec<usize> {
        let mut point = [0.0; 3];
        for (slot, value) in point.iter_mut().zip(reference) {
            *slot = *value;
        }
        let distances: Vec<f64> = (0..self.len())
            .map(|index| self.distance_squared(index, point))
            .collect();
        let mut order: Vec<usize> = (0..self.len()).collect();
        // Stable: equidistant sites keep their original order.
        order.sort_by(|a, b| distances[*a].total_cmp(&distances[*b]));
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nearest_first_with_planar_reference() {
        let a_cc = 0.142;
        let sites = Sites::new(
            array![0.0, 0.0],
            array![-a_cc / 2.0, a_cc / 2.0],
            array![0.0, 0.0],
        )
        .unwrap();
        assert_eq!(sites.argsort_nearest(&[0.0, a_cc / 2.0]), vec![1, 0]);
        assert_eq!(sites.find_nearest(&[0.0, -a_cc]), Some(0));
    }

    #[test]
    fn ties_keep_input_order() {
        let sites = Sites::new(array![-1.0, 1.0, 0.0], array![0.0, 0.0, 0.0], array![0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(sites.argsort_nearest(&[]), vec![2, 0, 1]);
    }

    #[test]
    fn nan_coordinates_do_not_break_the_ordering() {
        let sites = Sites::new(
            array![f64::NAN, 2.0, 1.0],
            array![0.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0],
        )
        .unwrap();
        let order = sites.argsort_nearest(&[0.0]);
        assert_eq!(order.len(), 3);
        let finite: Vec<usize> = order.into_iter().filter(|index| *index != 0).collect();
        assert_eq!(finite, vec![2, 1]);
    }

    #[test]
    fn rejects_ragged_coordinates() {
        let err = Sites::new(array![0.0], array![0.0, 1.0], array![0.0]).unwrap_err();
        assert_eq!(err.info().code, "sites.length-mismatch");
    }
}
