//! Colony simulation core: task scheduling, resource hotspots, zones,
//! recipes, raids, structures and versioned saves.
//!
//! `engine::ColonyEngine` owns the aggregate and drives the systems;
//! `command::CommandRouter` is the text surface a host talks to.

pub mod arena;
pub mod callbacks;
pub mod citizen;
pub mod clock;
pub mod command;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod event;
pub mod hotspot_subsystem;
pub mod insurance_subsystem;
pub mod raid_subsystem;
pub mod recipe_matcher;
pub mod rng;
pub mod save_service;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod structure_subsystem;
pub mod subsystem;
pub mod task_broker;
pub mod telemetry;
pub mod types;
pub mod zone_subsystem;
