//! Test module for represence-core
//!
//! This module contains tests for:
//! - Snapshot building for absent, empty and populated documents
//! - Word counting properties
//! - Configuration loading, defaults, reloads and diffing
