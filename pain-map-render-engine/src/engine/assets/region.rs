use constants::region::{LEFT_PREFIX, REGIONS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body side an overlay or a rating belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Right,
    Left,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Left => "left",
        }
    }
}

/// One rated region on one side, e.g. `Neck` or `left_Shoulder`.
///
/// Ordering follows the diagram: every right-side region in canonical order,
/// then every left-side region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey {
    side: Side,
    index: u8,
}

impl RegionKey {
    pub fn new(region: &str, side: Side) -> Option<Self> {
        let index = REGIONS.iter().position(|info| info.name == region)?;
        Some(Self {
            side,
            index: index as u8,
        })
    }

    /// Parse the flat key used by the rating flow and exported files.
    pub fn parse(key: &str) -> Option<Self> {
        match key.strip_prefix(LEFT_PREFIX) {
            Some(region) => Self::new(region, Side::Left),
            None => Self::new(key, Side::Right),
        }
    }

    /// All 28 keys in canonical order.
    pub fn all() -> impl Iterator<Item = Self> {
        [Side::Right, Side::Left].into_iter().flat_map(|side| {
            (0..REGIONS.len()).map(move |index| Self {
                side,
                index: index as u8,
            })
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn region(&self) -> &'static str {
        REGIONS[self.index as usize].name
    }

    pub fn label(&self) -> &'static str {
        REGIONS[self.index as usize].label
    }

    pub fn mirrored(&self) -> Self {
        let side = match self.side {
            Side::Right => Side::Left,
            Side::Left => Side::Right,
        };
        Self { side, ..*self }
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            Side::Right => f.write_str(self.region()),
            Side::Left => write!(f, "{LEFT_PREFIX}{}", self.region()),
        }
    }
}
