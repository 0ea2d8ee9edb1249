// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for coupled driver system-tests.
// Purpose: Provide per-test working directories.
// Dependencies: system-tests, tempfile
// ============================================================================

//! ## Overview
//! Shared helpers for coupled driver system-tests.
//! Invariants:
//! - Every test writes below its own root.
//! - Roots are removed after the test unless output is kept.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
