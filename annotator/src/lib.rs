//! The tutor's annotation engine.
//!
//! Periodically (or on demand) captures the student's page, asks a vision
//! backend what is wrong or right with it, and writes the answer back onto
//! the page as hand-drawn-looking markers, arrows and labels. Every write
//! goes through one [`lifecycle::LifecycleManager`]; the student's own
//! shapes are never modified.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | `Notebook`: wires a surface, a backend and the manager together |
//! | [`lifecycle`] | Pass state machine, exclusivity, coalescing, notices |
//! | [`bounds`] | Content bounds and capture padding |
//! | [`capture`] | Rasterize + PNG/base64 encode |
//! | [`client`] | Backend contract and wire types |
//! | [`http`] | `reqwest` implementation of the backend contract |
//! | [`annotation`] | Annotation model, wire decoding, clamping |
//! | [`mapper`] | Normalized box → page rectangle |
//! | [`dedup`] | Anchor-distance duplicate suppression |
//! | [`render`] | Marker / connector / label composites |
//! | [`tag`] | Metadata tags on engine-created shapes |
//! | [`selection`] | Selected marker → explanation detail |
//! | [`chat`] | Conversation with page snapshots |
//! | [`solution`] | Worked-solution text below the content |
//! | [`clock`] | Last-edit timestamp and active/idle mode |
//! | [`config`] | Environment configuration |
//! | [`error`] | Pass error taxonomy and stable error codes |

pub mod annotation;
pub mod bounds;
pub mod capture;
pub mod chat;
pub mod client;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod mapper;
pub mod render;
pub mod selection;
pub mod session;
pub mod solution;
pub mod tag;

#[cfg(test)]
#[path = "mocks_test.rs"]
pub(crate) mod mocks;
