#![deny(missing_docs)]
#![doc = "Model build: runs the modifier pipeline over a lattice and assembles the Hamiltonian."]

pub mod config;
pub mod hamiltonian;
pub mod model;

pub use config::ModelConfig;
pub use hamiltonian::Hamiltonian;
pub use model::{Model, System};
