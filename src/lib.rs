//! Praxis — core library of a psychology practice manager.
//!
//! Everything here is UI-agnostic: a frontend drives the managers and view
//! projections, and a [`gateway::Gateway`] implementation carries the rows.

pub mod auth;
pub mod collection; // notes & treatment plans
pub mod config;
pub mod gateway;
pub mod models;
pub mod roster; // patient list
pub mod schedule; // sessions, calendar, finance
pub mod status; // session status & payment transitions

pub use gateway::{Gateway, GatewayError, SqliteGateway};
