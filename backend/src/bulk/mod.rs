//! Scheduled bulks: the entity, its id generators, its assembly from
//! reconstructed pairs, and the pending-bulk repository.

pub mod assembler;
pub mod ids;
pub mod memory;
pub mod model;
pub mod repository;
