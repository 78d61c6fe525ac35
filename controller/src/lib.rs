//! Hot-water valve controller runtime: hardware resources, persistent
//! configuration, the adaptive control loop and its management API.

pub mod boot;
pub mod clock;
pub mod display;
pub mod hardware;
pub mod host;
pub mod logging;
pub mod rlock;
pub mod scheduler;
pub mod store;
pub mod web;
