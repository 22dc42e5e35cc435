//! Vessel definitions and footprint arithmetic.

use serde::{Deserialize, Serialize};

/// Orientation of a vessel on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

impl Orientation {
    /// The other orientation.
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }

    pub fn is_vertical(self) -> bool {
        self == Orientation::Vertical
    }

    fn from_vertical(vertical: bool) -> Self {
        if vertical {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

/// On the wire orientation travels as an `isVertical` flag.
mod is_vertical {
    use super::Orientation;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(o: &Orientation, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(o.is_vertical())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Orientation, D::Error> {
        bool::deserialize(d).map(Orientation::from_vertical)
    }
}

/// Catalog entry served by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselKind {
    pub id: u32,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A vessel that has not been anchored yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vessel {
    #[serde(rename = "type")]
    pub vessel_type: u32,
    pub size: usize,
    #[serde(rename = "isVertical", with = "is_vertical", default)]
    pub orientation: Orientation,
}

impl Vessel {
    pub fn new(vessel_type: u32, size: usize, orientation: Orientation) -> Self {
        Self {
            vessel_type,
            size,
            orientation,
        }
    }

    /// Bind this vessel to an anchor cell.
    pub fn anchored(self, row: usize, col: usize) -> PlacedVessel {
        PlacedVessel {
            vessel: self,
            position: Position { row, col },
        }
    }
}

impl From<&VesselKind> for Vessel {
    fn from(kind: &VesselKind) -> Self {
        Vessel::new(kind.id, kind.size, Orientation::Vertical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

/// A vessel bound to its anchor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedVessel {
    #[serde(flatten)]
    pub vessel: Vessel,
    pub position: Position,
}

impl PlacedVessel {
    pub fn anchor(&self) -> (usize, usize) {
        (self.position.row, self.position.col)
    }

    pub fn end(&self) -> (usize, usize) {
        footprint_end(
            self.position.row,
            self.position.col,
            self.vessel.size,
            self.vessel.orientation,
        )
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        footprint(
            self.position.row,
            self.position.col,
            self.vessel.size,
            self.vessel.orientation,
        )
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells().any(|cell| cell == (row, col))
    }
}

/// Last cell covered by a vessel of `size` anchored at (`row`, `col`).
///
/// `size` must be at least 1.
pub fn footprint_end(row: usize, col: usize, size: usize, orientation: Orientation) -> (usize, usize) {
    debug_assert!(size > 0, "vessel size must be positive");
    let span = size.saturating_sub(1);
    match orientation {
        Orientation::Vertical => (row + span, col),
        Orientation::Horizontal => (row, col + span),
    }
}

/// Every cell covered by the vessel, anchor first.
pub fn footprint(
    row: usize,
    col: usize,
    size: usize,
    orientation: Orientation,
) -> impl Iterator<Item = (usize, usize)> {
    (0..size).map(move |i| match orientation {
        Orientation::Vertical => (row + i, col),
        Orientation::Horizontal => (row, col + i),
    })
}
