//! Unit tests for kafka-admin-core.
//!
//! Scenarios run against `MemoryCoordination` and `MemoryGroupAdmin`.

pub mod cluster;
pub mod facade;
pub mod helpers;
pub mod reset;
