// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Engine: real-time placement validation for a layered rectangle editor.
//!
//! Pieces are rectangles, rotated in quarter turns, on three fixed layers. A
//! piece on one layer must be carried by the pieces on the layer beneath. The
//! engine answers three questions while a piece is being moved or resized:
//!
//! - Is this candidate placement legal? ([`fast`], synchronous, per tick.)
//! - What should it snap to? ([`snap`]: grid, edge collage, alignment guides.)
//! - Is the committed piece really supported? ([`exact`], asynchronous, via an
//!   [`ExactGeometryOracle`].)
//!
//! The two validation tiers are reconciled per piece by [`ghost`] into a
//! display-only ghost state. A missing or stale exact result counts as
//! supported.
//!
//! ## API overview
//!
//! - [`Editor`]: gestures, selection, commits, and the validation surface.
//! - [`Scene`] and [`reduce`]: immutable snapshots changed only through [`Command`]s.
//! - [`SceneIndex`]: per-layer adaptive spatial index over committed footprints,
//!   built on [`strata_index`].
//! - [`ExactRunner`] and [`TestDriver`]: two ways to pump exact jobs.
//! - [`SceneDocument`]: JSON import/export with legacy layer migration.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Rect, Vec2};
//! use strata_engine::{EngineConfig, Editor, LayerId, MaterialId, NewPiece, Rotation};
//!
//! let (mut editor, _driver) = Editor::with_test_driver(EngineConfig::default()).unwrap();
//! let id = editor
//!     .insert_piece(NewPiece {
//!         layer: LayerId::Base,
//!         rect: Rect::new(0.0, 0.0, 40.0, 40.0),
//!         rotation: Rotation::R0,
//!         material: MaterialId(0),
//!     })
//!     .unwrap();
//!
//! editor.select(id).unwrap();
//! editor.begin_drag().unwrap();
//! editor.update_drag(Vec2::new(100.0, 0.0)).unwrap();
//! assert!(editor.end_drag().unwrap().is_committed());
//! assert_eq!(editor.scene().piece(id).unwrap().rect.x0, 100.0);
//! ```
//!
//! Lengths are millimetres; times are milliseconds.

pub mod clock;
pub mod config;
pub mod document;
pub mod driver;
pub mod editor;
pub mod error;
pub mod exact;
pub mod fast;
pub mod geometry;
pub mod ghost;
pub mod group;
pub mod oracle;
pub mod problem;
pub mod runner;
pub mod scene;
pub mod scene_index;
pub mod snap;
pub mod types;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, IndexConfig, Millis, StrategyConfig};
pub use document::{SceneDocument, scene_from_json, scene_to_json};
pub use driver::TestDriver;
pub use editor::{CommitOutcome, Editor, GestureFeedback};
pub use error::{ConfigError, DocumentError, EngineError, OracleError};
pub use exact::{Discard, ExactJob, ExactOutcome, ExactTracker, Verdict, evaluate};
pub use fast::{Candidate, FastValidator};
pub use ghost::{GhostMachine, GhostPhase, GhostState};
pub use group::{GroupPreview, PreviewItem, preview_group_resize};
pub use oracle::{BooleanOp, ExactGeometryOracle, RectilinearOracle};
pub use problem::{Problem, ProblemCode, ValidationReport};
pub use runner::ExactRunner;
pub use scene::{Command, NewPiece, Scene, reduce};
pub use scene_index::{LayerFilter, SceneIndex};
pub use snap::{CollageMemory, Guide, GuideAxis, SnapEngine, SnapMode, SnapResult};
pub use types::{LayerFlags, LayerId, MaterialId, Piece, PieceId, ResizeHandle, Rotation, Severity};
