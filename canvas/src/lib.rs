//! Drawing surface for the tutoring notebook.
//!
//! This crate owns what is on the page: the shape model, an in-memory store,
//! the pan/zoom camera, hit-testing, and a CPU rasterizer that turns a page
//! region into pixels for vision capture. Programmatic writers reach it only
//! through the [`surface::Surface`] trait; [`engine::EngineCore`] is the
//! in-process implementation.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | `EngineCore`: store + camera + selection + listeners |
//! | [`surface`] | The `Surface` trait and rasterization options/errors |
//! | [`doc`] | Shapes, page bounds, and the shape store |
//! | [`camera`] | Pan/zoom camera and page/viewport conversions |
//! | [`hit`] | Hit-testing against shapes |
//! | [`raster`] | Region rasterization into RGBA buffers |
//! | [`consts`] | Shared numeric constants (hit slop, text metrics, raster limits) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod raster;
pub mod surface;
