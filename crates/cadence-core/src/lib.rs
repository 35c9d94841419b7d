//! Periodic tick scheduling for the Cadence console.
//!
//! This crate owns the real-time half of the system: a repeating wake
//! source and the driver that advances a simulation once per wake.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `cadence-config.yaml` into
//!   strongly-typed structs.
//! - [`driver`] -- [`TickDriver`] with the tick counter, progress events
//!   and the reinitialize-on-collapse policy.
//! - [`simulation`] -- The [`Simulation`] trait consumed by the driver and
//!   the [`SharedSimulation`] handle that serializes access to it.
//! - [`timer`] -- [`PeriodicTimer`], a coalescing fixed-interval wake source.
//!
//! [`TickDriver`]: driver::TickDriver
//! [`Simulation`]: simulation::Simulation
//! [`SharedSimulation`]: simulation::SharedSimulation
//! [`PeriodicTimer`]: timer::PeriodicTimer

pub mod config;
pub mod driver;
pub mod simulation;
pub mod timer;
