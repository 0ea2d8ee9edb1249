// system-tests/tests/reference_trees.rs
// ============================================================================
// Module: Reference Tree Suite
// Description: Generated run trees compared with stored reference trees.
// Purpose: Detect any change in generated scripts and model inputs.
// Dependencies: suites/reference_trees.rs, helpers
// ============================================================================

//! Reference tree suite entry point for system-tests.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions are permitted."
)]

mod helpers;

#[path = "suites/reference_trees.rs"]
mod reference_trees;
