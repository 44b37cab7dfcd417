//! Stupff - ffmpeg conversion and thumbnail tool
//!
//! This library crate exposes the configuration layer for integration testing.

pub mod config;
