//! Jobs Catalog Sync
//!
//! Client-side tooling for a jobs API: replaces the remote listing catalog
//! with a canonical set, retrieves and snapshots submitted applications, and
//! verifies every endpoint with an ordered set of probes.

pub mod config;
pub mod models;
pub mod services;
pub mod telemetry;
