//! Command handlers for delayq CLI
//!
//! This module contains the handlers for push, stats, inspect and consume.

pub mod consume;
pub mod inspect;
pub mod push;
pub mod stats;
