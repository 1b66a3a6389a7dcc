//! Site generation over a block of primitive cells.

use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tb_core::errors::{ErrorInfo, TbError};
use tb_core::IdArray;

use crate::lattice::{HoppingTerm, Lattice};

/// Number of primitive cells along each lattice vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrimitiveRepr")]
pub struct Primitive {
    size: [usize; 3],
}

#[derive(Deserialize)]
struct PrimitiveRepr {
    size: [usize; 3],
}

impl TryFrom<PrimitiveRepr> for Primitive {
    type Error = TbError;

    fn try_from(repr: PrimitiveRepr) -> Result<Self, Self::Error> {
        let [a1, a2, a3] = repr.size;
        Self::new(a1, a2, a3)
    }
}

impl Default for Primitive {
    fn default() -> Self {
        Self { size: [1, 1, 1] }
    }
}

impl Primitive {
    /// Creates a block of `a1 x a2 x a3` cells. Every count must be positive.
    pub fn new(a1: usize, a2: usize, a3: usize) -> Result<Self, TbError> {
        let size = [a1, a2, a3];
        if size.contains(&0) {
            return Err(TbError::Lattice(
                ErrorInfo::new("lattice.empty-primitive", "primitive cell counts must be positive")
                    .with_context("size", format!("{size:?}")),
            ));
        }
        Ok(Self { size })
    }

    /// Cell counts along each vector.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        self.size.iter().product()
    }
}

/// A bond between two valid sites, stored once per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    /// Source site index.
    pub from: usize,
    /// Destination site index.
    pub to: usize,
    /// Hopping energy id.
    pub hop_id: u16,
}

/// Every site of a primitive block: positions, sublattice ids and validity.
///
/// Sites are ordered cell by cell (first vector outermost) with the
/// sublattices of one cell contiguous. The block is centred on the origin.
#[derive(Debug, Clone)]
pub struct Foundation {
    lattice: Lattice,
    size: [usize; 3],
    x: Array1<f64>,
    y: Array1<f64>,
    z: Array1<f64>,
    sub_ids: Array1<u16>,
    valid: Array1<bool>,
    sub_names: Arc<std::collections::BTreeMap<String, u16>>,
}

impl Foundation {
    /// Generates the sites of `primitive` cells of `lattice`.
    pub fn new(lattice: &Lattice, primitive: Primitive) -> Result<Self, TbError> {
        let num_sub = lattice.sublattices().len();
        if num_sub == 0 {
            return Err(TbError::Lattice(ErrorInfo::new(
                "lattice.no-sublattices",
                "a lattice needs at least one sublattice to generate sites",
            )));
        }
        let size = primitive.size();
        if size[lattice.ndim()..].iter().any(|n| *n != 1) {
            return Err(TbError::Lattice(
                ErrorInfo::new(
                    "lattice.primitive-dims",
                    "primitive extends along a dimension the lattice does not have",
                )
                .with_context("size", format!("{size:?}"))
                .with_context("ndim", lattice.ndim()),
            ));
        }

        let vectors = padded_vectors(lattice);
        let mut origin = [0.0; 3];
        for (vector, count) in vectors.iter().zip(size) {
            for (o, v) in origin.iter_mut().zip(vector) {
                *o -= (count - 1) as f64 * v / 2.0;
            }
        }

        let num_sites = primitive.num_cells() * num_sub;
        let mut x = Vec::with_capacity(num_sites);
        let mut y = Vec::with_capacity(num_sites);
        let mut z = Vec::with_capacity(num_sites);
        let mut sub_ids = Vec::with_capacity(num_sites);
        for a in 0..size[0] {
            for b in 0..size[1] {
                for c in 0..size[2] {
                    let mut cell = origin;
                    for (axis, n) in [a, b, c].into_iter().enumerate() {
                        for (p, v) in cell.iter_mut().zip(vectors[axis]) {
                            *p += n as f64 * v;
                        }
                    }
                    for (id, sub) in lattice.sublattices().iter().enumerate() {
                        x.push(cell[0] + sub.offset[0]);
                        y.push(cell[1] + sub.offset[1]);
                        z.push(cell[2] + sub.offset[2]);
                        sub_ids.push(id as u16);
                    }
                }
            }
        }

        Ok(Self {
            lattice: lattice.clone(),
            size,
            x: Array1::from_vec(x),
            y: Array1::from_vec(y),
            z: Array1::from_vec(z),
            sub_ids: Array1::from_vec(sub_ids),
            valid: Array1::from_elem(num_sites, true),
            sub_names: lattice.sublattice_names(),
        })
    }

    /// Lattice the sites were generated from.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Cell counts along each vector.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Total number of sites, valid or not.
    pub fn num_sites(&self) -> usize {
        self.sub_ids.len()
    }

    /// Number of valid sites.
    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
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

    /// Replaces every site position.
    pub fn set_positions(
        &mut self,
        x: Array1<f64>,
        y: Array1<f64>,
        z: Array1<f64>,
    ) -> Result<(), TbError> {
        for (axis, values) in [("x", &x), ("y", &y), ("z", &z)] {
            self.check_len(axis, values.len())?;
        }
        self.x = x;
        self.y = y;
        self.z = z;
        Ok(())
    }

    /// Raw sublattice id of every site.
    pub fn raw_sub_ids(&self) -> &Array1<u16> {
        &self.sub_ids
    }

    /// Sublattice ids with the lattice's name table attached.
    pub fn sub_ids(&self) -> IdArray {
        IdArray::new(self.sub_ids.clone(), Arc::clone(&self.sub_names))
    }

    /// Validity flag of every site.
    pub fn is_valid(&self) -> &Array1<bool> {
        &self.valid
    }

    /// Replaces every validity flag.
    pub fn set_valid(&mut self, valid: Array1<bool>) -> Result<(), TbError> {
        self.check_len("state", valid.len())?;
        self.valid = valid;
        Ok(())
    }

    /// Onsite energy of every site, taken from its sublattice.
    pub fn onsite_energies(&self) -> Array1<f64> {
        let energies: Vec<f64> = self
            .lattice
            .sublattices()
            .iter()
            .map(|sub| sub.onsite_energy)
            .collect();
        self.sub_ids.mapv(|id| energies[usize::from(id)])
    }

    /// Site index of sublattice `sub` in `cell`.
    pub fn site_index(&self, cell: [usize; 3], sub: u16) -> usize {
        let num_sub = self.lattice.sublattices().len();
        ((cell[0] * self.size[1] + cell[1]) * self.size[2] + cell[2]) * num_sub + usize::from(sub)
    }

    /// Cell containing `site`.
    pub fn cell_of(&self, site: usize) -> [usize; 3] {
        let cell = site / self.lattice.sublattices().len();
        let c = cell % self.size[2];
        let b = (cell / self.size[2]) % self.size[1];
        let a = cell / (self.size[2] * self.size[1]);
        [a, b, c]
    }

    /// Site reached from `site` by `term`, if it lies inside the block.
    fn neighbor(&self, site: usize, term: &HoppingTerm) -> Option<usize> {
        let cell = self.cell_of(site);
        let mut target = [0usize; 3];
        for axis in 0..3 {
            let shifted = cell[axis] as i64 + i64::from(term.relative_index[axis]);
            if shifted < 0 || shifted >= self.size[axis] as i64 {
                return None;
            }
            target[axis] = shifted as usize;
        }
        Some(self.site_index(target, term.to))
    }

    fn terms_by_sublattice(&self) -> Vec<Vec<HoppingTerm>> {
        (0..self.lattice.sublattices().len())
            .map(|sub| self.lattice.terms_from(sub as u16))
            .collect()
    }

    /// In-block neighbour count of every site, ignoring validity.
    pub fn count_neighbors(&self) -> Vec<usize> {
        let terms = self.terms_by_sublattice();
        (0..self.num_sites())
            .map(|site| {
                terms[usize::from(self.sub_ids[site])]
                    .iter()
                    .filter(|term| self.neighbor(site, term).is_some())
                    .count()
            })
            .collect()
    }

    /// Invalidates sites left with fewer than `min_neighbors` valid
    /// neighbours once the already invalid sites are removed, cascading until
    /// stable. Returns the number of sites invalidated.
    pub fn trim_dangling(&mut self, min_neighbors: usize) -> usize {
        let terms = self.terms_by_sublattice();
        let mut counts = self.count_neighbors();
        let mut removed = 0;
        for start in 0..self.num_sites() {
            if self.valid[start] {
                continue;
            }
            let mut stack = vec![start];
            while let Some(site) = stack.pop() {
                if counts[site] == 0 {
                    continue;
                }
                for term in &terms[usize::from(self.sub_ids[site])] {
                    let Some(neighbor) = self.neighbor(site, term) else {
                        continue;
                    };
                    if !self.valid[neighbor] {
                        continue;
                    }
                    counts[neighbor] = counts[neighbor].saturating_sub(1);
                    if counts[neighbor] < min_neighbors {
                        self.valid[neighbor] = false;
                        removed += 1;
                        stack.push(neighbor);
                    }
                }
                counts[site] = 0;
            }
        }
        removed
    }

    /// Bonds between valid sites, one per pair, in site order.
    pub fn bonds(&self) -> Vec<Bond> {
        let hoppings = self.lattice.hoppings();
        let mut bonds = Vec::new();
        for site in 0..self.num_sites() {
            if !self.valid[site] {
                continue;
            }
            let sub = self.sub_ids[site];
            for term in hoppings.iter().filter(|term| term.from == sub) {
                if let Some(to) = self.neighbor(site, term).filter(|to| self.valid[*to]) {
                    bonds.push(Bond {
                        from: site,
                        to,
                        hop_id: term.hop_id,
                    });
                }
            }
        }
        bonds
    }

    fn check_len(&self, what: &str, len: usize) -> Result<(), TbError> {
        if len == self.num_sites() {
            return Ok(());
        }
        Err(TbError::Lattice(
            ErrorInfo::new("lattice.length-mismatch", format!("{what} has the wrong length"))
                .with_context("expected", self.num_sites())
                .with_context("actual", len),
        ))
    }
}

fn padded_vectors(lattice: &Lattice) -> [[f64; 3]; 3] {
    let mut vectors = [[0.0; 3]; 3];
    for (slot, vector) in vectors.iter_mut().zip(lattice.vectors()) {
        *slot = *vector;
    }
    vectors
}

/// Maps valid sites to consecutive Hamiltonian rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HamiltonianIndices {
    indices: Vec<Option<usize>>,
    num_valid: usize,
}

impl HamiltonianIndices {
    /// Numbers the valid sites of `foundation` in site order.
    pub fn new(foundation: &Foundation) -> Self {
        let mut num_valid = 0;
        let indices = foundation
            .is_valid()
            .iter()
            .map(|valid| {
                valid.then(|| {
                    num_valid += 1;
                    num_valid - 1
                })
            })
            .collect();
        Self { indices, num_valid }
    }

    /// Row of `site`, or `None` if the site is invalid.
    pub fn index_of(&self, site: usize) -> Option<usize> {
        self.indices.get(site).copied().flatten()
    }

    /// Number of valid sites, i.e. the Hamiltonian dimension.
    pub fn num_valid(&self) -> usize {
        self.num_valid
    }
}
