//! Core pipeline orchestration and domain logic for repodocs.
//!
//! This crate ties together repository discovery, section extraction,
//! optional AI enhancement and Docusaurus site writing into the end-to-end
//! `generate` workflow.

pub mod enrichment;
pub mod npm;
pub mod pipeline;
pub mod sections;
pub mod site;
