//! # IT+ Receiver Library
//!
//! Decode La Crosse IT+ temperature/humidity sensor frames and keep track of
//! registered and newly discovered sensors.
//!
//! This library provides the core functionality for turning raw 5-byte
//! radio frames into per-channel temperature and humidity readings.

pub mod config;
pub mod error;
pub mod itplus;
pub mod receiver;
pub mod registry;
pub mod snapshot;
pub mod source;
