//! Maps declared parameters onto the kind's canonical argument list.

use tb_core::errors::{ErrorInfo, TbError};
use tb_core::DynArray;

use crate::quantity::{ModifierKind, Quantity};
use crate::signature::BoundValue;
use crate::sites::SpatialIndex;

/// Where a declared parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Index into the kind's positional array list.
    Positional(usize),
    /// The spatial index built over the batch.
    Sites,
}

/// Binding table computed once at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    kind: ModifierKind,
    slots: Vec<Slot>,
}

/// A single value handed to a modifier.
#[derive(Debug, Clone, Copy)]
pub enum Argument<'a> {
    /// Array-valued quantity.
    Array(&'a DynArray),
    /// Spatial index.
    Sites(&'a dyn SpatialIndex),
}

impl<'a> From<&'a DynArray> for Argument<'a> {
    fn from(value: &'a DynArray) -> Self {
        Argument::Array(value)
    }
}

impl<'a, S: SpatialIndex> From<&'a S> for Argument<'a> {
    fn from(value: &'a S) -> Self {
        Argument::Sites(value)
    }
}

fn binding_error(code: &str, message: impl Into<String>) -> TbError {
    TbError::Binding(ErrorInfo::new(code, message))
}

impl Binding {
    /// Builds the table for `requested`, which must already be validated
    /// against `kind`.
    pub fn new(kind: ModifierKind, requested: &[Quantity]) -> Result<Self, TbError> {
        let slots = requested
            .iter()
            .map(|quantity| match quantity {
                Quantity::Sites if kind.accepts(Quantity::Sites) => Ok(Slot::Sites),
                other => kind.slot_of(*other).map(Slot::Positional).ok_or_else(|| {
                    binding_error(
                        "binding.unknown-slot",
                        format!("{kind} modifiers have no '{other}' argument"),
                    )
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { kind, slots })
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Whether the modifier reads the spatial index.
    pub fn needs_sites(&self) -> bool {
        self.slots.contains(&Slot::Sites)
    }

    /// Picks the declared subset out of the kind's full positional list.
    pub fn select<'a>(
        &self,
        full: &'a [DynArray],
        sites: Option<&'a dyn SpatialIndex>,
    ) -> Result<Vec<Argument<'a>>, TbError> {
        let expected = self.kind.positional().len();
        if full.len() != expected {
            return Err(binding_error(
                "binding.apply-arity",
                format!(
                    "{} modifiers are applied with {expected} arrays, got {}",
                    self.kind,
                    full.len()
                ),
            ));
        }
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Positional(index) => Ok(Argument::Array(&full[*index])),
                Slot::Sites => sites.map(Argument::Sites).ok_or_else(|| {
                    binding_error("binding.missing-sites", "no spatial index was provided")
                }),
            })
            .collect()
    }

    /// Checks that directly supplied arguments match the declared slots.
    pub fn check_call(&self, args: &[Argument<'_>]) -> Result<(), TbError> {
        if args.len() != self.slots.len() {
            return Err(binding_error(
                "binding.call-arity",
                format!(
                    "modifier declares {} argument(s), got {}",
                    self.slots.len(),
                    args.len()
                ),
            ));
        }
        for (position, (slot, arg)) in self.slots.iter().zip(args).enumerate() {
            let matches = matches!(
                (slot, arg),
                (Slot::Sites, Argument::Sites(_)) | (Slot::Positional(_), Argument::Array(_))
            );
            if !matches {
                return Err(binding_error(
                    "binding.argument-type",
                    format!("argument {position} does not match its declared quantity"),
                ));
            }
        }
        Ok(())
    }
}

/// Arguments as seen from inside a modifier body, in declaration order.
#[derive(Debug)]
pub struct ModifierArgs<'a> {
    names: &'a [Quantity],
    values: Vec<Argument<'a>>,
    extras: &'a [(String, BoundValue)],
}

impl<'a> ModifierArgs<'a> {
    pub(crate) fn new(
        names: &'a [Quantity],
        values: Vec<Argument<'a>>,
        extras: &'a [(String, BoundValue)],
    ) -> Self {
        Self {
            names,
            values,
            extras,
        }
    }

    /// Number of declared quantities.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the modifier declared no quantities.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument at declared position `index`.
    pub fn get(&self, index: usize) -> Option<Argument<'a>> {
        self.values.get(index).copied()
    }

    /// Array at declared position `index`.
    pub fn array(&self, index: usize) -> Result<&'a DynArray, TbError> {
        match self.get(index) {
            Some(Argument::Array(array)) => Ok(array),
            Some(Argument::Sites(_)) => Err(binding_error(
                "binding.argument-type",
                format!("argument {index} is the spatial index, not an array"),
            )),
            None => Err(binding_error(
                "binding.argument-index",
                format!("no argument at position {index}"),
            )),
        }
    }

    /// Spatial index at declared position `index`.
    pub fn sites(&self, index: usize) -> Result<&'a dyn SpatialIndex, TbError> {
        match self.get(index) {
            Some(Argument::Sites(sites)) => Ok(sites),
            _ => Err(binding_error(
                "binding.argument-type",
                format!("argument {index} is not the spatial index"),
            )),
        }
    }

    /// Argument bound to `quantity`, if declared.
    pub fn quantity(&self, quantity: Quantity) -> Option<Argument<'a>> {
        self.names
            .iter()
            .position(|name| *name == quantity)
            .and_then(|index| self.get(index))
    }

    /// Array bound to `quantity`.
    pub fn array_of(&self, quantity: Quantity) -> Result<&'a DynArray, TbError> {
        match self.quantity(quantity) {
            Some(Argument::Array(array)) => Ok(array),
            _ => Err(binding_error(
                "binding.undeclared",
                format!("'{quantity}' was not declared by this modifier"),
            )),
        }
    }

    /// Value of a defaulted parameter.
    pub fn extra(&self, name: &str) -> Option<&'a BoundValue> {
        self.extras
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}
