// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers, pieces, layers, and flags.

use core::fmt;

use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::error::InvalidRotation;

/// Identifier of a piece.
///
/// Ids are allocated by the scene and never reused within one scene lineage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub u64);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a material. Opaque to the engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u32);

/// One of the three fixed layers, in painter's order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    /// Bottom layer; always supported.
    Base,
    /// Supported by [`LayerId::Base`].
    Middle,
    /// Supported by [`LayerId::Middle`].
    Top,
}

impl LayerId {
    /// All layers, bottom first.
    pub const ALL: [Self; 3] = [Self::Base, Self::Middle, Self::Top];

    /// Painter's-order position, `0` for the bottom layer.
    pub const fn index(self) -> usize {
        match self {
            Self::Base => 0,
            Self::Middle => 1,
            Self::Top => 2,
        }
    }

    /// Layer at painter's-order position `index`.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Base),
            1 => Some(Self::Middle),
            2 => Some(Self::Top),
            _ => None,
        }
    }

    /// The layer directly beneath, which supports this one.
    pub const fn below(self) -> Option<Self> {
        match self {
            Self::Base => None,
            Self::Middle => Some(Self::Base),
            Self::Top => Some(Self::Middle),
        }
    }

    /// The layer directly above, which this one supports.
    pub const fn above(self) -> Option<Self> {
        match self {
            Self::Base => Some(Self::Middle),
            Self::Middle => Some(Self::Top),
            Self::Top => None,
        }
    }

    /// Stable name used in documents and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Middle => "middle",
            Self::Top => "top",
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Rotation in quarter turns.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// A quarter turn.
    R90,
    /// A half turn.
    R180,
    /// Three quarter turns.
    R270,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees into `[0, 360)`.
    pub fn from_degrees(degrees: i64) -> Result<Self, InvalidRotation> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::R0),
            90 => Ok(Self::R90),
            180 => Ok(Self::R180),
            270 => Ok(Self::R270),
            _ => Err(InvalidRotation(degrees)),
        }
    }

    /// Degrees in `[0, 360)`.
    pub const fn degrees(self) -> i64 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Whether the bounding box swaps width and height.
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }

    /// One more quarter turn clockwise.
    pub const fn turned(self) -> Self {
        match self {
            Self::R0 => Self::R90,
            Self::R90 => Self::R180,
            Self::R180 => Self::R270,
            Self::R270 => Self::R0,
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for i64 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

bitflags::bitflags! {
    /// Layer flags controlling visibility and editing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LayerFlags: u8 {
        /// Layer is drawn.
        const VISIBLE = 0b0000_0001;
        /// Layer rejects geometry edits.
        const LOCKED  = 0b0000_0010;
    }
}

impl Default for LayerFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// Severity of a validation finding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; never blocks a commit.
    Warn,
    /// Fails the gesture; the commit is rolled back.
    Block,
}

/// Resize handle on a rectangle: the edges it moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    /// Top edge.
    North,
    /// Bottom edge.
    South,
    /// Right edge.
    East,
    /// Left edge.
    West,
    /// Top and right edges.
    NorthEast,
    /// Top and left edges.
    NorthWest,
    /// Bottom and right edges.
    SouthEast,
    /// Bottom and left edges.
    SouthWest,
}

impl ResizeHandle {
    /// Whether the handle moves the left edge.
    pub const fn moves_left(self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }

    /// Whether the handle moves the right edge.
    pub const fn moves_right(self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }

    /// Whether the handle moves the top edge.
    pub const fn moves_top(self) -> bool {
        matches!(self, Self::North | Self::NorthEast | Self::NorthWest)
    }

    /// Whether the handle moves the bottom edge.
    pub const fn moves_bottom(self) -> bool {
        matches!(self, Self::South | Self::SouthEast | Self::SouthWest)
    }
}

/// A placed rectangle.
///
/// `rect` is the stored, unrotated rectangle: top-left position plus width and
/// height in millimetres. The footprint on the scene is
/// [`piece_aabb`](crate::geometry::piece_aabb).
#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    /// Identity.
    pub id: PieceId,
    /// Owning layer. Fixed at creation.
    pub layer: LayerId,
    /// Stored, unrotated rectangle.
    pub rect: Rect,
    /// Quarter-turn rotation about the rectangle centre.
    pub rotation: Rotation,
    /// Material reference.
    pub material: MaterialId,
    /// Incremented on every geometry change.
    pub revision: u64,
}

impl Piece {
    /// Footprint on the scene.
    pub fn aabb(&self) -> Rect {
        crate::geometry::piece_aabb(self)
    }
}
