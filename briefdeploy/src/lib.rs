//! briefdeploy: brief in, published single-page app out.
//!
//! A request carries a natural-language brief, a task identifier and a
//! round number. The brief goes to a language model, the resulting page is
//! committed to a GitHub repository named after the task (created on round 1,
//! revised afterwards), served by GitHub Pages, and the caller's callback is
//! told where it landed.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod llm;
pub mod notify;
pub mod orchestrator;
pub mod types;
pub mod vcs;
pub mod web;
