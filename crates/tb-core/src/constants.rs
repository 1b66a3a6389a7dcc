//! Physical constants in the units used throughout the toolkit (nm, eV, s).

/// Reduced Planck constant in eV·s.
pub const HBAR: f64 = 6.582_119_569e-16;

