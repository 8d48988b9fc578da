//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own prompt building and model-output decoding so route
//! handlers can stay focused on protocol translation.

pub mod mathtext;
pub mod tutor;
