//! Fixed-tick simulation host for the tiered block-state engine.
//!
//! The binary loads a [`config::SimConfig`] and a material table, generates a
//! flat region, and drives it with the engine's tick driver while a set of
//! ambient [`simulation::SimulationLayer`]s read snapshots and issue delayed
//! writes.

pub mod config;
pub mod materials;
pub mod metrics;
pub mod simulation;
pub mod worldgen;
