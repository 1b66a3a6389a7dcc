#![deny(missing_docs)]
#![doc = "Lattice description and site generation feeding the modifier pipeline."]

pub mod foundation;
pub mod lattice;
pub mod repository;

pub use foundation::{Bond, Foundation, HamiltonianIndices, Primitive};
pub use lattice::{HoppingEnergy, HoppingTerm, Lattice, Sublattice, DEFAULT_MIN_NEIGHBORS};
