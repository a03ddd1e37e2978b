//! Emblem placement relative to the text box.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fraction of the smaller box side kept clear between an edge anchor and the box edge.
const INSET_FRACTION: f64 = 0.1;

/// Named anchor for an emblem inside the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmblemSnap {
    Center,
    Left,
    Right,
    AboveText,
    BelowText,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl FromStr for EmblemSnap {
    type Err = std::convert::Infallible;

    /// Unrecognized names anchor at the center.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "left" => Self::Left,
            "right" => Self::Right,
            "above_text" => Self::AboveText,
            "below_text" => Self::BelowText,
            "top_left" => Self::TopLeft,
            "top_right" => Self::TopRight,
            "bottom_left" => Self::BottomLeft,
            "bottom_right" => Self::BottomRight,
            _ => Self::Center,
        })
    }
}

impl EmblemSnap {
    /// Anchor position relative to the box center for a `box_w` × `box_h` box.
    pub fn snap_position(self, box_w: f64, box_h: f64) -> (f64, f64) {
        let smaller = box_w.min(box_h);
        let inset = if smaller > 0.0 { smaller * INSET_FRACTION } else { 0.0 };
        let left = -box_w / 2.0 + inset;
        let right = box_w / 2.0 - inset;
        let top = box_h / 2.0 - inset;
        let bottom = -box_h / 2.0 + inset;

        match self {
            Self::Center => (0.0, 0.0),
            Self::Left => (left, 0.0),
            Self::Right => (right, 0.0),
            Self::AboveText => (0.0, top),
            Self::BelowText => (0.0, bottom),
            Self::TopLeft => (left, top),
            Self::TopRight => (right, top),
            Self::BottomLeft => (left, bottom),
            Self::BottomRight => (right, bottom),
        }
    }
}
