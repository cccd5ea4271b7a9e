//! Lane-constrained driving simulation whose cars learn by evolving small
//! threshold networks across generations.

pub mod canvas;
pub mod config;
pub mod controls;
pub mod evolution;
pub mod geometry;
pub mod network;
pub mod road;
pub mod sensor;
pub mod storage;
pub mod traffic;
pub mod vehicle;
