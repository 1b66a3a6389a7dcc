//! Model assembly: lattice + primitive + modifiers -> Hamiltonian.

use std::fmt::Write as _;

use ndarray::Array1;
use serde::Serialize;
use tb_core::errors::{ErrorInfo, TbError};
use tb_core::{stable_hash_string, DynArray, IdArray, NumericDType};
use tb_lattice::{Foundation, HamiltonianIndices, Lattice, Primitive};
use tb_modifier::{unify_flags, CapabilityFlags, Modifier, ModifierDescriptor, ModifierKind};

use crate::config::ModelConfig;
use crate::hamiltonian::Hamiltonian;

/// Base dtype of lattice-provided energies.
const LATTICE_DTYPE: NumericDType = NumericDType::Float32;

/// A lattice, a block of primitive cells and an ordered list of modifiers.
#[derive(Debug, Clone)]
pub struct Model {
    lattice: Lattice,
    primitive: Primitive,
    config: ModelConfig,
    modifiers: Vec<Modifier>,
}

/// Result of [`Model::build`].
#[derive(Debug, Clone)]
pub struct System {
    foundation: Foundation,
    indices: HamiltonianIndices,
    hamiltonian: Hamiltonian,
}

impl System {
    /// Sites after state and position modifiers and trimming.
    pub fn foundation(&self) -> &Foundation {
        &self.foundation
    }

    /// Row numbering of the valid sites.
    pub fn indices(&self) -> &HamiltonianIndices {
        &self.indices
    }

    /// Assembled Hamiltonian.
    pub fn hamiltonian(&self) -> &Hamiltonian {
        &self.hamiltonian
    }

    /// Consumes the system, keeping the Hamiltonian.
    pub fn into_hamiltonian(self) -> Hamiltonian {
        self.hamiltonian
    }
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    lattice: &'a Lattice,
    primitive: Primitive,
    config: &'a ModelConfig,
    modifiers: Vec<ModifierDescriptor>,
}

impl Model {
    /// A single primitive cell of `lattice` with default configuration.
    pub fn new(lattice: Lattice) -> Self {
        Self {
            lattice,
            primitive: Primitive::default(),
            config: ModelConfig::default(),
            modifiers: Vec::new(),
        }
    }

    /// Replaces the primitive block.
    pub fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }

    /// Replaces the build configuration.
    pub fn with_config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends a modifier; builder form of [`Model::add_modifier`].
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.add_modifier(modifier);
        self
    }

    /// Appends a modifier. Modifiers of one kind run in insertion order.
    pub fn add_modifier(&mut self, modifier: Modifier) -> &mut Self {
        self.modifiers.push(modifier);
        self
    }

    /// Lattice.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Primitive block.
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    /// Build configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Registered modifiers in insertion order.
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Unified dtype of the build, decided before any modifier runs.
    pub fn dtype(&self) -> NumericDType {
        let forced = CapabilityFlags {
            is_complex: false,
            is_double: self.config.force_double,
        };
        unify_flags(
            LATTICE_DTYPE,
            self.modifiers
                .iter()
                .map(CapabilityFlags::of)
                .chain(std::iter::once(forced)),
        )
    }

    /// Stable hash of the lattice, block, configuration and modifier signatures.
    pub fn fingerprint(&self) -> Result<String, TbError> {
        stable_hash_string(&Fingerprint {
            lattice: &self.lattice,
            primitive: self.primitive,
            config: &self.config,
            modifiers: self.modifiers.iter().map(Modifier::descriptor).collect(),
        })
    }

    fn of_kind(&self, kind: ModifierKind) -> impl Iterator<Item = &Modifier> {
        self.modifiers
            .iter()
            .filter(move |modifier| modifier.kind() == kind)
    }

    /// Runs the modifier pipeline and assembles the Hamiltonian.
    ///
    /// Site-state modifiers run first, then site-position modifiers, then
    /// dangling sites are trimmed, then onsite and hopping modifiers. Each
    /// modifier sees the output of the previous one of its kind.
    pub fn build(&self) -> Result<System, TbError> {
        let dtype = self.dtype();
        let real = dtype.to_real();
        log::debug!(
            "building model with {} modifier(s) in {dtype}",
            self.modifiers.len()
        );

        let mut foundation = Foundation::new(&self.lattice, self.primitive)?;
        self.apply_site_state(&mut foundation, real)?;
        self.apply_site_position(&mut foundation, real)?;

        if self.config.trim_dangling {
            let min_neighbors = self
                .config
                .min_neighbors
                .unwrap_or_else(|| self.lattice.min_neighbors());
            let removed = foundation.trim_dangling(min_neighbors);
            if removed > 0 {
                log::warn!(
                    "trimmed {removed} dangling site(s) with fewer than {min_neighbors} neighbours"
                );
            }
        }

        let indices = HamiltonianIndices::new(&foundation);
        let valid: Vec<usize> = (0..foundation.num_sites())
            .filter(|site| indices.index_of(*site).is_some())
            .collect();

        let onsite = self.apply_onsite(&foundation, &valid, dtype)?;

        let bonds = foundation.bonds();
        let hopping = self.apply_hopping(&foundation, &bonds, dtype)?;
        let rows: Vec<(usize, usize)> = bonds
            .iter()
            .map(|bond| row_pair(&indices, bond.from, bond.to))
            .collect::<Result<_, _>>()?;

        let hamiltonian = Hamiltonian::assemble(dtype, &onsite, &rows, &hopping)?;
        log::info!(
            "built {dtype} hamiltonian: {} site(s), {} hopping(s), {} triplet(s)",
            hamiltonian.size(),
            bonds.len(),
            hamiltonian.nnz()
        );
        Ok(System {
            foundation,
            indices,
            hamiltonian,
        })
    }

    /// Shorthand for `build()` keeping only the Hamiltonian.
    pub fn hamiltonian(&self) -> Result<Hamiltonian, TbError> {
        self.build().map(System::into_hamiltonian)
    }

    /// Builds the model and renders a short human-readable summary.
    pub fn report(&self) -> Result<String, TbError> {
        let system = self.build()?;
        let foundation = system.foundation();
        let hamiltonian = system.hamiltonian();
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "lattice: {} sublattice(s), {} hopping term(s), {}D",
            self.lattice.sublattices().len(),
            self.lattice.hoppings().len(),
            self.lattice.ndim()
        );
        let _ = writeln!(
            out,
            "sites: {} ({} valid)",
            foundation.num_sites(),
            foundation.num_valid()
        );
        let _ = writeln!(out, "hoppings: {}", foundation.bonds().len());
        let _ = writeln!(out, "dtype: {}", hamiltonian.dtype());
        let _ = writeln!(out, "modifiers: {}", self.modifiers.len());
        for modifier in &self.modifiers {
            let _ = writeln!(out, "  {} {}", modifier.kind(), modifier);
        }
        log::info!("{}", out.trim_end());
        Ok(out)
    }

    fn site_arrays(&self, foundation: &Foundation, sites: &[usize], real: NumericDType) -> [DynArray; 4] {
        let pick = |values: &Array1<f64>| -> DynArray {
            let picked: Vec<f64> = sites.iter().map(|site| values[*site]).collect();
            DynArray::from_reals(real, &picked)
        };
        let sub_ids = foundation.sub_ids();
        let ids: Array1<u16> = sites.iter().map(|site| sub_ids.ids()[*site]).collect();
        [
            pick(foundation.x()),
            pick(foundation.y()),
            pick(foundation.z()),
            DynArray::Id(sub_ids.with_ids(ids)),
        ]
    }

    fn apply_site_state(&self, foundation: &mut Foundation, real: NumericDType) -> Result<(), TbError> {
        let all: Vec<usize> = (0..foundation.num_sites()).collect();
        for modifier in self.of_kind(ModifierKind::SiteState) {
            let [x, y, z, sub_id] = self.site_arrays(foundation, &all, real);
            let state = DynArray::Bool(foundation.is_valid().clone());
            let mut out = modifier.apply(&[state, x, y, z, sub_id])?;
            let state = match out.pop() {
                Some(DynArray::Bool(state)) => state,
                _ => return Err(stage_error(modifier, "site-state output is not boolean")),
            };
            foundation.set_valid(state)?;
            log::debug!("{modifier}: {} valid site(s)", foundation.num_valid());
        }
        Ok(())
    }

    fn apply_site_position(
        &self,
        foundation: &mut Foundation,
        real: NumericDType,
    ) -> Result<(), TbError> {
        let all: Vec<usize> = (0..foundation.num_sites()).collect();
        for modifier in self.of_kind(ModifierKind::SitePosition) {
            let full = self.site_arrays(foundation, &all, real);
            let out = modifier.apply(&full)?;
            let [x, y, z] = <[DynArray; 3]>::try_from(out)
                .map_err(|_| stage_error(modifier, "site-position output is not three arrays"))?;
            foundation.set_positions(x.to_f64()?, y.to_f64()?, z.to_f64()?)?;
            log::debug!("{modifier}: moved {} site(s)", foundation.num_sites());
        }
        Ok(())
    }

    fn apply_onsite(
        &self,
        foundation: &Foundation,
        valid: &[usize],
        dtype: NumericDType,
    ) -> Result<DynArray, TbError> {
        let base = foundation.onsite_energies();
        let picked: Vec<f64> = valid.iter().map(|site| base[*site]).collect();
        let mut energy = DynArray::from_reals(dtype, &picked);
        if valid.is_empty() {
            return Ok(energy);
        }
        let [x, y, z, sub_id] = self.site_arrays(foundation, valid, dtype.to_real());
        for modifier in self.of_kind(ModifierKind::OnsiteEnergy) {
            let full = [energy, x.clone(), y.clone(), z.clone(), sub_id.clone()];
            energy = self.single_output(modifier, &full, dtype)?;
        }
        Ok(energy)
    }

    fn apply_hopping(
        &self,
        foundation: &Foundation,
        bonds: &[tb_lattice::Bond],
        dtype: NumericDType,
    ) -> Result<DynArray, TbError> {
        let energies = bonds
            .iter()
            .map(|bond| {
                self.lattice.hopping_energy(bond.hop_id).ok_or_else(|| {
                    TbError::Model(
                        ErrorInfo::new("model.unknown-hopping", "bond refers to a missing hopping")
                            .with_context("hop_id", bond.hop_id),
                    )
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        let mut energy = DynArray::from_reals(dtype, &energies);
        if bonds.is_empty() {
            return Ok(energy);
        }

        let real = dtype.to_real();
        let hop_id = DynArray::Id(IdArray::new(
            bonds.iter().map(|bond| bond.hop_id).collect(),
            self.lattice.hopping_names(),
        ));
        let from: Vec<usize> = bonds.iter().map(|bond| bond.from).collect();
        let to: Vec<usize> = bonds.iter().map(|bond| bond.to).collect();
        let [x1, y1, z1, _] = self.site_arrays(foundation, &from, real);
        let [x2, y2, z2, _] = self.site_arrays(foundation, &to, real);

        for modifier in self.of_kind(ModifierKind::HoppingEnergy) {
            let full = [
                energy,
                hop_id.clone(),
                x1.clone(),
                y1.clone(),
                z1.clone(),
                x2.clone(),
                y2.clone(),
                z2.clone(),
            ];
            energy = self.single_output(modifier, &full, dtype)?;
        }
        Ok(energy)
    }

    /// Applies an energy modifier and brings its output back to `dtype`.
    fn single_output(
        &self,
        modifier: &Modifier,
        full: &[DynArray],
        dtype: NumericDType,
    ) -> Result<DynArray, TbError> {
        let mut out = modifier.apply(full)?;
        let energy = out
            .pop()
            .ok_or_else(|| stage_error(modifier, "energy modifier returned nothing"))?;
        energy.cast(dtype).map_err(|err| {
            err.with_context("modifier", modifier)
                .with_context("kind", modifier.kind())
        })
    }
}

fn row_pair(indices: &HamiltonianIndices, from: usize, to: usize) -> Result<(usize, usize), TbError> {
    match (indices.index_of(from), indices.index_of(to)) {
        (Some(i), Some(j)) => Ok((i, j)),
        _ => Err(TbError::Model(
            ErrorInfo::new("model.invalid-bond", "bond touches an invalid site")
                .with_context("from", from)
                .with_context("to", to),
        )),
    }
}

fn stage_error(modifier: &Modifier, message: &str) -> TbError {
    TbError::Model(
        ErrorInfo::new("model.stage-output", message)
            .with_context("modifier", modifier)
            .with_context("kind", modifier.kind()),
    )
}
