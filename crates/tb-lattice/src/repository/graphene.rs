//! Monolayer graphene.

use tb_core::constants::HBAR;
use tb_core::TbError;

use crate::lattice::Lattice;

/// Unit cell length [nm].
pub const A: f64 = 0.24595;
/// Carbon-carbon distance [nm].
pub const A_CC: f64 = 0.142;
/// Nearest neighbour hopping [eV].
pub const T: f64 = -2.8;
/// Fermi velocity [nm/s]: `3 / (2 hbar) * |t| * a_cc`.
pub const VF: f64 = 3.0 / (2.0 * HBAR) * -T * A_CC;

/// Nearest-neighbour monolayer with sublattices `A` and `B` and a single
/// hopping energy `t`.
pub fn monolayer() -> Result<Lattice, TbError> {
    Lattice::new(vec![[A, 0.0, 0.0], [A / 2.0, A / 2.0 * 3f64.sqrt(), 0.0]])?
        .add_sublattice("A", [0.0, -A_CC / 2.0, 0.0], 0.0)?
        .add_sublattice("B", [0.0, A_CC / 2.0, 0.0], 0.0)?
        .register_hopping_energy("t", T)?
        .add_hopping([0, 0, 0], "A", "B", "t")?
        .add_hopping([1, -1, 0], "A", "B", "t")?
        .add_hopping([0, -1, 0], "A", "B", "t")
        .map(|lattice| lattice.with_min_neighbors(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fermi_velocity_is_about_a_million_metres_per_second() {
        let metres_per_second = VF * 1e-9;
        assert!((0.8e6..1.0e6).contains(&metres_per_second));
    }
}
