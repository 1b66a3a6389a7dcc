#![deny(missing_docs)]
#![doc = "Modifier framework: user functions that perturb onsite energies, hopping energies, site positions and site activity."]

pub mod binder;
pub mod modifier;
pub mod quantity;
pub mod signature;
pub mod sites;
pub mod unify;
pub mod validate;

pub use binder::{Argument, Binding, ModifierArgs, Slot};
pub use modifier::{
    hopping_energy_modifier, hopping_energy_modifier_with, onsite_energy_modifier,
    onsite_energy_modifier_with, site_position_modifier, site_position_modifier_with,
    site_state_modifier, site_state_modifier_with, Decorator, Modifier, ModifierDescriptor,
    ModifierFn, ModifierOptions, ModifierReturn, ModifierSpec, PROBE_LEN,
};
pub use quantity::{ModifierKind, Quantity};
pub use signature::{BoundValue, Introspection, ParamDecl, Signature};
pub use sites::{Sites, SpatialIndex};
pub use unify::{unify_dtype, unify_flags, CapabilityFlags};
pub use validate::{validate_return, ReturnContract};
