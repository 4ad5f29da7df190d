//! Shared test utilities for the datactx workspace.
//!
//! This crate provides project fixtures so crate test suites do not each
//! hand-roll temporary project layouts. It is a dev-dependency only.
//!
//! # Modules
//!
//! - [`fixtures`]: canned `datactx.yml` documents
//! - [`project`]: [`project::TestProject`] builder for on-disk projects

pub mod fixtures;
pub mod project;
