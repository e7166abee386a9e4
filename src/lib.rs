//! # Rattable Architecture
//!
//! Rattable is a **host-agnostic raster attribute table (RAT) library**.
//! It owns the table model, the two on-disk encodings and the
//! classification logic; everything a GIS host would do (pixel access,
//! rendering, legend widgets) stays behind traits.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Host layer (GIS application, not in this crate)            │
//! │  - Implements RasterLayer / ColorRamp / LegendView          │
//! │  - Owns pixels, renderers and widgets                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Lifecycle layer (loader.rs, writer.rs, classify.rs)        │
//! │  - Finds, loads, saves and classifies tables                │
//! │  - Pending-write registry for the embedded durability quirk │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Table layer (rat.rs, fields.rs, model.rs)                  │
//! │  - Column-major table with typed fields and usage roles     │
//! │  - Structural rules, color group atomicity, virtual colors  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Codec layer (codec/)                                       │
//! │  - aux_xml: embedded PAM metadata (entity-escaped XML)      │
//! │  - dbf: dBASE III sidecar tables (.vat.dbf)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Table Shapes
//!
//! A table is usable once it carries exactly one value shape: thematic
//! (a single `Value` column keying discrete classes) or athematic
//! (`ValueMin`/`ValueMax` columns keying continuous ranges). Everything
//! downstream (validity, save, classification, renderer choice)
//! dispatches on that shape. See [`rat::Rat::table_type`].
//!
//! ## Key Principle: No Host Assumptions in Core
//!
//! Core code takes plain arguments and returns `Result`; it never talks
//! to a rendering pipeline or a widget. The same lifecycle drives a real
//! GIS binding or the in-memory doubles under [`raster::memory`], which
//! is how the test suite exercises classification end to end.
//!
//! ## Module Overview
//!
//! - [`rat`]: The table aggregate and its mutation rules
//! - [`fields`]: Field types and usage roles
//! - [`model`]: Cells, columns, colors, table shape
//! - [`codec`]: aux.xml and .vat.dbf encodings, path derivation
//! - [`loader`]: Encoding discovery, role inference and repair
//! - [`writer`]: Provenance-dispatched saves, pending-write registry
//! - [`classify`]: Renderer construction and legend deduplication
//! - [`raster`]: Host-side traits plus in-memory doubles
//! - [`config`]: Host-tunable settings
//! - [`error`]: Error types

pub mod classify;
pub mod codec;
pub mod config;
pub mod error;
pub mod fields;
pub mod loader;
pub mod model;
pub mod rat;
pub mod raster;
pub mod writer;
