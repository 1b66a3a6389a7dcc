//! Physical quantity vocabulary and the four modifier kinds.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A named array-valued quantity a modifier may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Onsite or hopping energy.
    Energy,
    /// Site x coordinate.
    X,
    /// Site y coordinate.
    Y,
    /// Site z coordinate.
    Z,
    /// Sublattice id of each site.
    SubId,
    /// Spatial index over the batch's sites.
    Sites,
    /// Site activity flags.
    State,
    /// Hopping id of each bond.
    HopId,
    /// Bond start x coordinate.
    X1,
    /// Bond start y coordinate.
    Y1,
    /// Bond start z coordinate.
    Z1,
    /// Bond end x coordinate.
    X2,
    /// Bond end y coordinate.
    Y2,
    /// Bond end z coordinate.
    Z2,
}

impl Quantity {
    /// Parameter name used in modifier signatures.
    pub const fn name(self) -> &'static str {
        match self {
            Quantity::Energy => "energy",
            Quantity::X => "x",
            Quantity::Y => "y",
            Quantity::Z => "z",
            Quantity::SubId => "sub_id",
            Quantity::Sites => "sites",
            Quantity::State => "state",
            Quantity::HopId => "hop_id",
            Quantity::X1 => "x1",
            Quantity::Y1 => "y1",
            Quantity::Z1 => "z1",
            Quantity::X2 => "x2",
            Quantity::Y2 => "y2",
            Quantity::Z2 => "z2",
        }
    }

    /// Looks a quantity up by its parameter name.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|quantity| quantity.name() == name)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALL: &[Quantity] = &[
    Quantity::Energy,
    Quantity::X,
    Quantity::Y,
    Quantity::Z,
    Quantity::SubId,
    Quantity::Sites,
    Quantity::State,
    Quantity::HopId,
    Quantity::X1,
    Quantity::Y1,
    Quantity::Z1,
    Quantity::X2,
    Quantity::Y2,
    Quantity::Z2,
];

const ONSITE_ENERGY: &[Quantity] = &[
    Quantity::Energy,
    Quantity::X,
    Quantity::Y,
    Quantity::Z,
    Quantity::SubId,
    Quantity::Sites,
];

const HOPPING_ENERGY: &[Quantity] = &[
    Quantity::Energy,
    Quantity::HopId,
    Quantity::X1,
    Quantity::Y1,
    Quantity::Z1,
    Quantity::X2,
    Quantity::Y2,
    Quantity::Z2,
];

const SITE_POSITION: &[Quantity] = &[
    Quantity::X,
    Quantity::Y,
    Quantity::Z,
    Quantity::SubId,
    Quantity::Sites,
];

const SITE_STATE: &[Quantity] = &[
    Quantity::State,
    Quantity::X,
    Quantity::Y,
    Quantity::Z,
    Quantity::SubId,
    Quantity::Sites,
];

/// The four places a modifier can hook into the model build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModifierKind {
    /// Rewrites the Hamiltonian diagonal.
    OnsiteEnergy,
    /// Rewrites the Hamiltonian off-diagonal.
    HoppingEnergy,
    /// Moves sites.
    SitePosition,
    /// Enables or disables sites.
    SiteState,
}

impl ModifierKind {
    /// Every quantity a modifier of this kind may request, in canonical order.
    pub const fn vocabulary(self) -> &'static [Quantity] {
        match self {
            ModifierKind::OnsiteEnergy => ONSITE_ENERGY,
            ModifierKind::HoppingEnergy => HOPPING_ENERGY,
            ModifierKind::SitePosition => SITE_POSITION,
            ModifierKind::SiteState => SITE_STATE,
        }
    }

    /// The positional arrays `apply` expects: the vocabulary without `sites`,
    /// which is always derived from the positions.
    pub fn positional(self) -> &'static [Quantity] {
        let vocabulary = self.vocabulary();
        match vocabulary.last() {
            Some(Quantity::Sites) => &vocabulary[..vocabulary.len() - 1],
            _ => vocabulary,
        }
    }

    /// Index of `quantity` in the positional list.
    pub fn slot_of(self, quantity: Quantity) -> Option<usize> {
        self.positional().iter().position(|q| *q == quantity)
    }

    /// Whether `quantity` belongs to this kind's vocabulary.
    pub fn accepts(self, quantity: Quantity) -> bool {
        self.vocabulary().contains(&quantity)
    }

    /// Inputs replaced by the returned arrays, in return order.
    pub const fn replaces(self) -> &'static [Quantity] {
        match self {
            ModifierKind::OnsiteEnergy | ModifierKind::HoppingEnergy => &[Quantity::Energy],
            ModifierKind::SitePosition => &[Quantity::X, Quantity::Y, Quantity::Z],
            ModifierKind::SiteState => &[Quantity::State],
        }
    }

    /// Number of arrays a modifier of this kind must return.
    pub const fn num_returns(self) -> usize {
        self.replaces().len()
    }

    /// Whether complex output is accepted without an explicit declaration.
    pub const fn complex_by_default(self) -> bool {
        matches!(self, ModifierKind::HoppingEnergy)
    }

    /// Whether the replaced quantity is an energy (and may therefore be complex).
    pub const fn is_energy(self) -> bool {
        matches!(
            self,
            ModifierKind::OnsiteEnergy | ModifierKind::HoppingEnergy
        )
    }

    /// Kebab-case name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            ModifierKind::OnsiteEnergy => "onsite-energy",
            ModifierKind::HoppingEnergy => "hopping-energy",
            ModifierKind::SitePosition => "site-position",
            ModifierKind::SiteState => "site-state",
        }
    }
}

impl Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_lists_drop_sites() {
        assert_eq!(ModifierKind::OnsiteEnergy.positional().len(), 5);
        assert_eq!(ModifierKind::HoppingEnergy.positional().len(), 8);
        assert_eq!(ModifierKind::SitePosition.positional().len(), 4);
        assert_eq!(ModifierKind::SiteState.positional().len(), 5);
        assert_eq!(ModifierKind::SiteState.slot_of(Quantity::SubId), Some(4));
        assert_eq!(ModifierKind::HoppingEnergy.slot_of(Quantity::Sites), None);
    }

    #[test]
    fn names_round_trip() {
        for quantity in ALL {
            assert_eq!(Quantity::from_name(quantity.name()), Some(*quantity));
        }
        assert_eq!(Quantity::from_name("w"), None);
    }
}
