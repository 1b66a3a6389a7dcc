//! Ready-made lattices.

pub mod graphene;
