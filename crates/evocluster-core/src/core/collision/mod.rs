//! Geometric validity checks.
//!
//! Collision detection flags non-bonded atoms that come closer than a scaled sum of their
//! covalent radii. Dissociation detection flags clusters that fall apart, either because the
//! distance graph is disconnected or because a bond was stretched too far. Both share the
//! distance cache kept in a [`CollisionInfo`](info::CollisionInfo) record.

pub mod bonds;
pub mod detection;
pub mod dissociation;
pub mod info;
