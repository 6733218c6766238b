//! Creature catalog browser and turn-based battle TUI.
//!
//! The library exposes the store, engine and reducer modules so they can be
//! exercised from integration tests.

pub mod action;
pub mod api;
pub mod battle;
pub mod catalog;
pub mod creature;
pub mod effect;
pub mod reducer;
pub mod state;
pub mod ui;
