//! RIN update tracker library.
//!
//! A service that tracks CS.RIN.RU forum topics as proxies for game
//! release/update activity. Each check fetches the final page of a topic,
//! scores the rendered posts with a fixed weighted-rule system, and runs a
//! small state machine against persisted post pointers to decide whether a
//! genuine update has appeared since the last check.

pub mod checker;
pub mod config;
pub mod constants;
pub mod db;
pub mod forum;
pub mod metadata;
pub mod scoring;
pub mod web;
