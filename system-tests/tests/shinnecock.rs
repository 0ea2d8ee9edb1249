// system-tests/tests/shinnecock.rs
// ============================================================================
// Module: Shinnecock Inlet Suite
// Description: Generation over the downloaded Shinnecock Inlet mesh.
// Purpose: Exercise a real mesh and nodal attribute file end to end.
// Dependencies: suites/shinnecock.rs, helpers
// ============================================================================

//! Shinnecock Inlet suite entry point for system-tests.

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

#[path = "suites/shinnecock.rs"]
mod shinnecock;
