//! Structural verification.
//!
//! This module provides:
//! - The recursive differ between declared and observed trees
//! - Assertion options and hooks that decide what a difference means

mod differ;
mod policy;

pub use differ::{diff, DiffEvent, TypedValue};
pub use policy::{AssertHooks, AssertOpts, AssertPolicy, AssertionHook, DiffHook};
