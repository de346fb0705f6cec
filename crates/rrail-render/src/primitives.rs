//! Draw primitives and the sink contract.

use std::collections::BTreeMap;

use rrail_core::{Point, Rect};

/// What a primitive draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// An axis-aligned rectangle outline; `filled` requests a solid fill.
    Rect { rect: Rect, filled: bool },
    /// A straight line segment.
    Line { from: Point, to: Point, dashed: bool },
    /// An ellipse inscribed in `rect`.
    Oval { rect: Rect },
    /// Text anchored at `origin` (top-left), fixed-pitch.
    Text { origin: Point, text: String },
}

/// The role a primitive plays, for host styling and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawRole {
    Comment,
    RungNumber,
    Wire,
    PowerRail,
    BranchRail,
    BranchStub,
    Connector,
    Symbol,
    SymbolDetail,
    Label,
    Highlight,
}

/// One tagged draw instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPrimitive {
    pub rung: u32,
    pub role: DrawRole,
    pub shape: Shape,
}

/// Receives ordered primitives, one rung at a time.
///
/// The painter clears a rung before re-emitting it; implementations must
/// drop exactly the primitives previously submitted for that rung.
pub trait RenderSink {
    /// Remove every primitive previously emitted for `rung`.
    fn clear_rung(&mut self, rung: u32);

    /// Append one primitive; submission order is draw order.
    fn draw(&mut self, primitive: DrawPrimitive);
}

/// An in-memory sink keeping per-rung primitive batches.
///
/// Used by tests and headless hosts to inspect exactly what a pass emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    batches: BTreeMap<u32, Vec<DrawPrimitive>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives recorded for one rung, in draw order.
    pub fn rung_primitives(&self, rung: u32) -> &[DrawPrimitive] {
        self.batches.get(&rung).map_or(&[], Vec::as_slice)
    }

    /// Rung numbers with recorded primitives.
    pub fn rungs(&self) -> impl Iterator<Item = u32> + '_ {
        self.batches.keys().copied()
    }

    /// Total primitive count across all rungs.
    pub fn len(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.values().all(Vec::is_empty)
    }
}

impl RenderSink for RecordingSink {
    fn clear_rung(&mut self, rung: u32) {
        self.batches.remove(&rung);
    }

    fn draw(&mut self, primitive: DrawPrimitive) {
        self.batches
            .entry(primitive.rung)
            .or_default()
            .push(primitive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(rung: u32) -> DrawPrimitive {
        DrawPrimitive {
            rung,
            role: DrawRole::Wire,
            shape: Shape::Line {
                from: Point::new(0, 0),
                to: Point::new(10, 0),
                dashed: false,
            },
        }
    }

    #[test]
    fn clear_removes_exactly_one_rung() {
        let mut sink = RecordingSink::new();
        sink.draw(line(0));
        sink.draw(line(0));
        sink.draw(line(1));
        assert_eq!(sink.rung_primitives(0).len(), 2);

        sink.clear_rung(0);
        assert!(sink.rung_primitives(0).is_empty());
        assert_eq!(sink.rung_primitives(1).len(), 1);
    }

    #[test]
    fn draw_order_is_preserved() {
        let mut sink = RecordingSink::new();
        sink.draw(DrawPrimitive {
            rung: 0,
            role: DrawRole::Comment,
            shape: Shape::Text {
                origin: Point::new(0, 0),
                text: "first".into(),
            },
        });
        sink.draw(line(0));
        let batch = sink.rung_primitives(0);
        assert_eq!(batch[0].role, DrawRole::Comment);
        assert_eq!(batch[1].role, DrawRole::Wire);
    }
}
