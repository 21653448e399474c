//! Core library for Represence.
//!
//! Holds everything that does not touch the network: the [`Document`]
//! abstraction over a host's active editor, the pure snapshot builder that
//! turns a document into a [`FileInfo`], and the user settings.

pub mod config;
pub mod document;
pub mod snapshot;

mod error;

#[cfg(test)]
mod tests;

pub use document::{Document, TextDocument, language_for_extension};
pub use error::{Error, Result};
pub use snapshot::{build, count_words};

pub use represence_types::*;
