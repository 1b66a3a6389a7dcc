//! Lattice description: primitive vectors, sublattices and hopping terms.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tb_core::errors::{ErrorInfo, TbError};

/// Default minimum neighbour count used when trimming dangling sites.
pub const DEFAULT_MIN_NEIGHBORS: usize = 1;

fn lattice_error(code: &str, message: impl Into<String>) -> TbError {
    TbError::Lattice(ErrorInfo::new(code, message))
}

/// A named site inside the unit cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sublattice {
    /// Unique name, e.g. `"A"`.
    pub name: String,
    /// Position relative to the unit cell origin.
    pub offset: [f64; 3],
    /// Onsite energy of every site of this sublattice.
    pub onsite_energy: f64,
}

/// A named hopping energy shared by any number of hopping terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoppingEnergy {
    /// Unique name, e.g. `"t"`.
    pub name: String,
    /// Energy value.
    pub energy: f64,
}

/// A directed bond from sublattice `from` in cell `n` to sublattice `to` in
/// cell `n + relative_index`. The conjugate direction is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoppingTerm {
    /// Cell offset of the destination site.
    pub relative_index: [i32; 3],
    /// Sublattice id of the source site.
    pub from: u16,
    /// Sublattice id of the destination site.
    pub to: u16,
    /// Hopping energy id.
    pub hop_id: u16,
}

impl HoppingTerm {
    fn conjugate(self) -> Self {
        let [a, b, c] = self.relative_index;
        Self {
            relative_index: [-a, -b, -c],
            from: self.to,
            to: self.from,
            hop_id: self.hop_id,
        }
    }
}

/// Crystal lattice built up with chained calls:
///
/// ```
/// use tb_lattice::Lattice;
///
/// let lattice = Lattice::new(vec![[1.0, 0.0, 0.0]])?
///     .add_sublattice("A", [0.0, 0.0, 0.0], 0.0)?
///     .register_hopping_energy("t", -1.0)?
///     .add_hopping([1, 0, 0], "A", "A", "t")?;
/// assert_eq!(lattice.sub_id("A")?, 0);
/// # Ok::<(), tb_core::TbError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    vectors: Vec<[f64; 3]>,
    sublattices: Vec<Sublattice>,
    hopping_energies: Vec<HoppingEnergy>,
    hoppings: Vec<HoppingTerm>,
    min_neighbors: usize,
}

impl Lattice {
    /// Creates a lattice from one to three primitive vectors.
    pub fn new(vectors: Vec<[f64; 3]>) -> Result<Self, TbError> {
        if vectors.is_empty() || vectors.len() > 3 {
            return Err(lattice_error(
                "lattice.dimensions",
                format!("a lattice needs 1 to 3 primitive vectors, got {}", vectors.len()),
            ));
        }
        if let Some(index) = vectors
            .iter()
            .position(|v| v.iter().any(|c| !c.is_finite()) || v.iter().all(|c| *c == 0.0))
        {
            return Err(TbError::Lattice(
                ErrorInfo::new(
                    "lattice.degenerate-vector",
                    "primitive vectors must be finite and non-zero",
                )
                .with_context("index", index),
            ));
        }
        Ok(Self {
            vectors,
            sublattices: Vec::new(),
            hopping_energies: Vec::new(),
            hoppings: Vec::new(),
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        })
    }

    /// Adds a sublattice; ids are assigned in insertion order.
    pub fn add_sublattice(
        mut self,
        name: impl Into<String>,
        offset: [f64; 3],
        onsite_energy: f64,
    ) -> Result<Self, TbError> {
        let name = name.into();
        if self.sublattices.iter().any(|sub| sub.name == name) {
            return Err(TbError::Lattice(
                ErrorInfo::new("lattice.duplicate-sublattice", "sublattice names must be unique")
                    .with_context("name", &name),
            ));
        }
        if self.sublattices.len() >= usize::from(u16::MAX) {
            return Err(lattice_error("lattice.too-many-sublattices", "sublattice ids are 16 bit"));
        }
        if !onsite_energy.is_finite() || offset.iter().any(|c| !c.is_finite()) {
            return Err(TbError::Lattice(
                ErrorInfo::new("lattice.non-finite", "sublattice offset and energy must be finite")
                    .with_context("name", &name),
            ));
        }
        self.sublattices.push(Sublattice {
            name,
            offset,
            onsite_energy,
        });
        Ok(self)
    }

    /// Registers a named hopping energy; ids are assigned in insertion order.
    pub fn register_hopping_energy(
        mut self,
        name: impl Into<String>,
        energy: f64,
    ) -> Result<Self, TbError> {
        let name = name.into();
        if self.hopping_energies.iter().any(|hop| hop.name == name) {
            return Err(TbError::Lattice(
                ErrorInfo::new("lattice.duplicate-hopping", "hopping energy names must be unique")
                    .with_context("name", &name),
            ));
        }
        if self.hopping_energies.len() >= usize::from(u16::MAX) {
            return Err(lattice_error("lattice.too-many-hoppings", "hopping ids are 16 bit"));
        }
        if !energy.is_finite() {
            return Err(TbError::Lattice(
                ErrorInfo::new("lattice.non-finite", "hopping energy must be finite")
                    .with_context("name", &name),
            ));
        }
        self.hopping_energies.push(HoppingEnergy { name, energy });
        Ok(self)
    }

    /// Adds a hopping term between two sublattices.
    ///
    /// Offsets along dimensions the lattice does not have must be zero. A term
    /// may not connect a site to itself, and a term and its conjugate may only
    /// be added once.
    pub fn add_hopping(
        mut self,
        relative_index: [i32; 3],
        from: &str,
        to: &str,
        energy: &str,
    ) -> Result<Self, TbError> {
        let term = HoppingTerm {
            relative_index,
            from: self.sub_id(from)?,
            to: self.sub_id(to)?,
            hop_id: self.hop_id(energy)?,
        };
        if relative_index[self.ndim()..].iter().any(|c| *c != 0) {
            return Err(TbError::Lattice(
                ErrorInfo::new(
                    "lattice.bad-offset",
                    "relative index leaves the lattice's dimensions",
                )
                .with_context("relative_index", format!("{relative_index:?}"))
                .with_context("ndim", self.ndim()),
            ));
        }
        if relative_index == [0, 0, 0] && term.from == term.to {
            return Err(lattice_error(
                "lattice.onsite-hopping",
                format!("hopping from '{from}' to itself in the same cell; use an onsite energy"),
            ));
        }
        let duplicate = self.hoppings.iter().any(|existing| {
            let same = |t: HoppingTerm| {
                t.relative_index == existing.relative_index
                    && t.from == existing.from
                    && t.to == existing.to
            };
            same(term) || same(term.conjugate())
        });
        if duplicate {
            return Err(TbError::Lattice(
                ErrorInfo::new("lattice.duplicate-term", "hopping term already exists")
                    .with_context("relative_index", format!("{relative_index:?}"))
                    .with_context("from", from)
                    .with_context("to", to),
            ));
        }
        self.hoppings.push(term);
        Ok(self)
    }

    /// Sets the neighbour count below which sites are trimmed.
    pub fn with_min_neighbors(mut self, min_neighbors: usize) -> Self {
        self.min_neighbors = min_neighbors;
        self
    }

    /// Primitive vectors.
    pub fn vectors(&self) -> &[[f64; 3]] {
        &self.vectors
    }

    /// Number of primitive vectors.
    pub fn ndim(&self) -> usize {
        self.vectors.len()
    }

    /// Sublattices in id order.
    pub fn sublattices(&self) -> &[Sublattice] {
        &self.sublattices
    }

    /// Hopping energies in id order.
    pub fn hopping_energies(&self) -> &[HoppingEnergy] {
        &self.hopping_energies
    }

    /// Hopping terms in insertion order.
    pub fn hoppings(&self) -> &[HoppingTerm] {
        &self.hoppings
    }

    /// Neighbour count below which sites are trimmed.
    pub fn min_neighbors(&self) -> usize {
        self.min_neighbors
    }

    /// Id of the sublattice called `name`.
    pub fn sub_id(&self, name: &str) -> Result<u16, TbError> {
        lookup(
            self.sublattices.iter().map(|sub| sub.name.as_str()),
            name,
            "sublattice",
        )
    }

    /// Id of the hopping energy called `name`.
    pub fn hop_id(&self, name: &str) -> Result<u16, TbError> {
        lookup(
            self.hopping_energies.iter().map(|hop| hop.name.as_str()),
            name,
            "hopping",
        )
    }

    /// Energy of the hopping with id `hop_id`.
    pub fn hopping_energy(&self, hop_id: u16) -> Option<f64> {
        self.hopping_energies
            .get(usize::from(hop_id))
            .map(|hop| hop.energy)
    }

    /// Sublattice name table shared by every sublattice id array.
    pub fn sublattice_names(&self) -> Arc<BTreeMap<String, u16>> {
        Arc::new(name_table(self.sublattices.iter().map(|sub| &sub.name)))
    }

    /// Hopping name table shared by every hopping id array.
    pub fn hopping_names(&self) -> Arc<BTreeMap<String, u16>> {
        Arc::new(name_table(self.hopping_energies.iter().map(|hop| &hop.name)))
    }

    /// Every bond leaving sublattice `sub`, conjugates included.
    pub(crate) fn terms_from(&self, sub: u16) -> Vec<HoppingTerm> {
        self.hoppings
            .iter()
            .flat_map(|term| [*term, term.conjugate()])
            .filter(|term| term.from == sub)
            .collect()
    }
}

fn lookup<'a>(
    names: impl Iterator<Item = &'a str> + Clone,
    name: &str,
    what: &str,
) -> Result<u16, TbError> {
    if let Some(index) = names.clone().position(|candidate| candidate == name) {
        return u16::try_from(index)
            .map_err(|_| lattice_error("lattice.id-overflow", "id does not fit 16 bits"));
    }
    let known = names.collect::<Vec<_>>().join(",");
    Err(TbError::Lattice(
        ErrorInfo::new("lattice.unknown-name", format!("unknown {what} name '{name}'"))
            .with_context("known", known),
    ))
}

fn name_table<'a>(names: impl Iterator<Item = &'a String>) -> BTreeMap<String, u16> {
    names
        .enumerate()
        .filter_map(|(index, name)| u16::try_from(index).ok().map(|id| (name.clone(), id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Lattice {
        Lattice::new(vec![[1.0, 0.0, 0.0]])
            .and_then(|l| l.add_sublattice("A", [0.0; 3], 0.5))
            .and_then(|l| l.register_hopping_energy("t", -1.0))
            .unwrap()
    }

    #[test]
    fn conjugate_terms_are_duplicates() {
        let lattice = chain()
            .add_sublattice("B", [0.5, 0.0, 0.0], 0.0)
            .and_then(|l| l.add_hopping([0, 0, 0], "A", "B", "t"))
            .unwrap();
        let err = lattice.add_hopping([0, 0, 0], "B", "A", "t").unwrap_err();
        assert_eq!(err.info().code, "lattice.duplicate-term");
    }

    #[test]
    fn terms_from_include_conjugates() {
        let lattice = chain().add_hopping([1, 0, 0], "A", "A", "t").unwrap();
        let terms = lattice.terms_from(0);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].relative_index, [-1, 0, 0]);
    }

    #[test]
    fn offsets_outside_dimensions_are_rejected() {
        let err = chain().add_hopping([0, 1, 0], "A", "A", "t").unwrap_err();
        assert_eq!(err.info().code, "lattice.bad-offset");
    }

    #[test]
    fn unknown_names_list_known_ones() {
        let err = chain().sub_id("Z").unwrap_err();
        assert_eq!(err.info().code, "lattice.unknown-name");
        assert_eq!(err.info().context["known"], "A");
    }
}
