//! Coordinate transforms and random draws shared by the models and the search operators.

pub mod geometry;
pub mod random;
