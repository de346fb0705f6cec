//! Fixed layout constants.

use serde::{Deserialize, Serialize};

/// The spacing and sizing constants one engine instance lays out with.
///
/// All values are logical pixels. Hosts that persist a metrics profile can
/// round-trip this through serde; the defaults match the classic editor
/// grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    /// Nominal rung band height; also the minimum content height.
    pub rung_height: i32,
    /// Contact symbol box.
    pub contact_width: i32,
    pub contact_height: i32,
    /// Coil symbol box.
    pub coil_width: i32,
    pub coil_height: i32,
    /// Function block box before operand text widens it.
    pub block_width: i32,
    pub block_height: i32,
    /// Vertical gap between branch nesting levels and sibling legs.
    pub branch_spacing: i32,
    /// Horizontal gap between adjacent elements in one context.
    pub element_spacing: i32,
    /// X position of the left power rail.
    pub left_rail_x: i32,
    /// Default X position of the right power rail; a wide rung pushes it out.
    pub right_rail_x: i32,
    /// Top Y of the first rung in a document.
    pub first_rung_y: i32,
    /// Fixed-pitch text cell, used for labels, block rows, and comments.
    pub char_width: i32,
    pub char_height: i32,
    /// Radius of branch rail connector dots.
    pub connector_radius: i32,
    /// Padding added below a rung's content.
    pub rung_padding: i32,
    /// Padding added below a comment block's text lines.
    pub comment_padding: i32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            rung_height: 100,
            contact_width: 40,
            contact_height: 30,
            coil_width: 40,
            coil_height: 30,
            block_width: 80,
            block_height: 40,
            branch_spacing: 80,
            element_spacing: 50,
            left_rail_x: 40,
            right_rail_x: 1400,
            first_rung_y: 50,
            char_width: 6,
            char_height: 16,
            connector_radius: 5,
            rung_padding: 20,
            comment_padding: 20,
        }
    }
}

impl LayoutMetrics {
    /// Height of a rung's comment block for the given line count.
    pub fn comment_height(&self, lines: u32) -> i32 {
        if lines == 0 {
            0
        } else {
            lines as i32 * self.char_height + self.comment_padding
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_height_is_lines_plus_padding() {
        let metrics = LayoutMetrics::default();
        assert_eq!(metrics.comment_height(0), 0);
        assert_eq!(metrics.comment_height(3), 3 * 16 + 20);
    }

    #[test]
    fn metrics_round_trip_through_serde() {
        let metrics = LayoutMetrics::default();
        let json = serde_json::to_string(&metrics).unwrap();
        let back: LayoutMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(metrics, back);
    }
}
