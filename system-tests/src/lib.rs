// system-tests/src/lib.rs
// ============================================================================
// Module: Coupled Driver System Tests Library
// Description: Shared configuration and helpers for system test scenarios.
// Purpose: Compare generated run trees with stored reference directories.
// Dependencies: coupled-driver-config, coupled-driver-core, time
// ============================================================================

//! ## Overview
//! This crate hosts the helpers used by the system-test binaries in
//! `system-tests/tests`: harness settings, the sample mesh and run
//! configurations, reference-directory comparison, and (behind the
//! `network-tests` feature) mesh download.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod harness;
#[cfg(feature = "network-tests")]
pub mod download;
pub mod fixtures;
pub mod reference;
