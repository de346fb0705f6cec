//! Turns committed rung geometry into an ordered primitive stream.

use std::collections::HashMap;

use rrail_core::{BranchId, ElementKind, Instruction, Point, Rect, StructuralError, SymbolKind};
use rrail_layout::{LadderElement, LayoutMetrics, RungGeometry};
use smallvec::SmallVec;

use crate::primitives::{DrawPrimitive, DrawRole, RenderSink, Shape};

/// Per-element primitive batch; most symbols emit fewer than eight.
type Batch = SmallVec<[DrawPrimitive; 8]>;

/// Paints rung geometry as draw primitives.
///
/// Emission order per rung is deterministic: comment block, rung number,
/// wires and symbols in sequence order, branch rails and stubs, power
/// rails, and the closing wire to the right rail. The previous pass's
/// primitives for the rung are cleared first.
#[derive(Debug, Clone)]
pub struct RungPainter {
    metrics: LayoutMetrics,
}

impl RungPainter {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self { metrics }
    }

    /// Paint every rung of a document.
    pub fn paint_document<'a>(
        &self,
        rungs: impl IntoIterator<Item = &'a RungGeometry>,
        sink: &mut dyn RenderSink,
    ) -> Result<(), StructuralError> {
        for geo in rungs {
            self.paint_rung(geo, sink)?;
        }
        Ok(())
    }

    /// Re-emit one rung: clear its previous primitives, then draw.
    pub fn paint_rung(
        &self,
        geo: &RungGeometry,
        sink: &mut dyn RenderSink,
    ) -> Result<(), StructuralError> {
        let m = &self.metrics;
        let rung = geo.rung;
        sink.clear_rung(rung);

        if geo.comment_height > 0 {
            sink.draw(DrawPrimitive {
                rung,
                role: DrawRole::Comment,
                shape: Shape::Rect {
                    rect: Rect::new(
                        m.left_rail_x,
                        geo.top_y,
                        geo.right_rail_x - m.left_rail_x,
                        geo.comment_height,
                    ),
                    filled: true,
                },
            });
            sink.draw(DrawPrimitive {
                rung,
                role: DrawRole::Comment,
                shape: Shape::Text {
                    origin: Point::new(m.left_rail_x, geo.top_y),
                    text: geo.comment.clone(),
                },
            });
        }

        sink.draw(DrawPrimitive {
            rung,
            role: DrawRole::RungNumber,
            shape: Shape::Text {
                origin: Point::new(15, geo.centerline_y),
                text: rung.to_string(),
            },
        });

        // Wires chain context-locally: each element connects back to the
        // previous element placed in its own context.
        let mut last_right: HashMap<Option<BranchId>, i32> = HashMap::new();
        for el in &geo.elements {
            let context = el.context_branch_id;
            let anchor = match context {
                None => m.left_rail_x,
                Some(id) => geo.branches.get(id)?.start_x,
            };
            let prev_right = last_right.get(&context).copied().unwrap_or(anchor);
            if el.kind != ElementKind::BranchEnd && el.rect.x > prev_right {
                sink.draw(DrawPrimitive {
                    rung,
                    role: DrawRole::Wire,
                    shape: Shape::Line {
                        from: Point::new(prev_right, el.wire_y),
                        to: Point::new(el.rect.x, el.wire_y),
                        dashed: false,
                    },
                });
            }
            last_right.insert(context, el.rect.right());

            for primitive in self.element_primitives(el) {
                sink.draw(primitive);
            }
        }

        // Branch rails: verticals spanning group wire to last leg wire,
        // plus a stub from each leg's last element to the right rail
        // column.
        for group in geo.branches.iter() {
            if geo.branches.is_leg(group.branch_id) {
                continue;
            }
            if let Some(&last) = group.children.last() {
                let last_y = geo.branches.get(last)?.branch_y;
                for x in [group.start_x, group.end_x] {
                    sink.draw(DrawPrimitive {
                        rung,
                        role: DrawRole::BranchRail,
                        shape: Shape::Line {
                            from: Point::new(x, group.branch_y),
                            to: Point::new(x, last_y),
                            dashed: false,
                        },
                    });
                }
            }
            let mut legs: Vec<(BranchId, i32)> =
                vec![(group.branch_id, group.branch_y)];
            for &child in &group.children {
                legs.push((child, geo.branches.get(child)?.branch_y));
            }
            for (leg, wire_y) in legs {
                let from_x = geo
                    .context_elements(Some(leg))
                    .last()
                    .map_or(group.start_x + m.connector_radius, |el| el.rect.right());
                let to_x = group.end_x - m.connector_radius;
                if to_x > from_x {
                    sink.draw(DrawPrimitive {
                        rung,
                        role: DrawRole::BranchStub,
                        shape: Shape::Line {
                            from: Point::new(from_x, wire_y),
                            to: Point::new(to_x, wire_y),
                            dashed: false,
                        },
                    });
                }
            }
        }

        // Power rails.
        for x in [m.left_rail_x, geo.right_rail_x] {
            sink.draw(DrawPrimitive {
                rung,
                role: DrawRole::PowerRail,
                shape: Shape::Line {
                    from: Point::new(x, geo.top_y),
                    to: Point::new(x, geo.bottom()),
                    dashed: false,
                },
            });
        }

        // Closing wire from the last main element to the right rail.
        let main_right = last_right.get(&None).copied().unwrap_or(m.left_rail_x);
        if geo.right_rail_x > main_right {
            sink.draw(DrawPrimitive {
                rung,
                role: DrawRole::Wire,
                shape: Shape::Line {
                    from: Point::new(main_right, geo.centerline_y),
                    to: Point::new(geo.right_rail_x, geo.centerline_y),
                    dashed: false,
                },
            });
        }

        Ok(())
    }

    /// The primitives for one element's own box: symbol, details, labels,
    /// selection highlight.
    pub fn element_primitives(&self, el: &LadderElement) -> Batch {
        let mut batch = Batch::new();
        match el.kind {
            ElementKind::BranchStart | ElementKind::BranchNext | ElementKind::BranchEnd => {
                batch.push(DrawPrimitive {
                    rung: el.rung,
                    role: DrawRole::Connector,
                    shape: Shape::Oval { rect: el.rect },
                });
            }
            ElementKind::Instruction => {
                if let Some(instruction) = &el.instruction {
                    self.symbol_primitives(el, instruction, &mut batch);
                }
            }
        }
        if el.selected {
            batch.push(DrawPrimitive {
                rung: el.rung,
                role: DrawRole::Highlight,
                shape: Shape::Rect {
                    rect: el.rect,
                    filled: false,
                },
            });
        }
        batch
    }

    fn symbol_primitives(&self, el: &LadderElement, instruction: &Instruction, batch: &mut Batch) {
        let m = &self.metrics;
        let sym = el.symbol_rect();
        match instruction.symbol_kind() {
            SymbolKind::Contact { normally_closed } => {
                batch.push(DrawPrimitive {
                    rung: el.rung,
                    role: DrawRole::Symbol,
                    shape: Shape::Rect {
                        rect: sym,
                        filled: false,
                    },
                });
                if normally_closed {
                    batch.push(self.detail_line(
                        el.rung,
                        Point::new(sym.x + 5, sym.y + 5),
                        Point::new(sym.right() - 5, sym.bottom() - 5),
                    ));
                } else {
                    for x in [sym.x + 10, sym.right() - 10] {
                        batch.push(self.detail_line(
                            el.rung,
                            Point::new(x, sym.y + 5),
                            Point::new(x, sym.bottom() - 5),
                        ));
                    }
                }
                self.label_primitives(el, instruction, batch);
            }
            SymbolKind::Coil { marker } => {
                batch.push(DrawPrimitive {
                    rung: el.rung,
                    role: DrawRole::Symbol,
                    shape: Shape::Oval { rect: sym },
                });
                if let Some(marker) = marker {
                    batch.push(DrawPrimitive {
                        rung: el.rung,
                        role: DrawRole::SymbolDetail,
                        shape: Shape::Text {
                            origin: Point::new(
                                sym.center_x() - m.char_width / 2,
                                sym.center_y() - m.char_height / 2,
                            ),
                            text: marker.to_string(),
                        },
                    });
                }
                self.label_primitives(el, instruction, batch);
            }
            SymbolKind::Block => {
                batch.push(DrawPrimitive {
                    rung: el.rung,
                    role: DrawRole::Symbol,
                    shape: Shape::Rect {
                        rect: sym,
                        filled: false,
                    },
                });
                let name = instruction.mnemonic();
                batch.push(DrawPrimitive {
                    rung: el.rung,
                    role: DrawRole::SymbolDetail,
                    shape: Shape::Text {
                        origin: Point::new(
                            sym.center_x() - text_width(name, m.char_width) / 2,
                            sym.y + 4,
                        ),
                        text: name.to_string(),
                    },
                });
                let rows_top = sym.y + self.metrics.block_height / 2 + 5;
                for (row, operand) in instruction.operands().iter().enumerate() {
                    batch.push(DrawPrimitive {
                        rung: el.rung,
                        role: DrawRole::SymbolDetail,
                        shape: Shape::Text {
                            origin: Point::new(
                                sym.x + 15,
                                rows_top + row as i32 * m.char_height,
                            ),
                            text: operand.clone(),
                        },
                    });
                }
            }
        }
    }

    /// Operand text (and alias, when present) centered in the label band
    /// above the symbol.
    fn label_primitives(&self, el: &LadderElement, instruction: &Instruction, batch: &mut Batch) {
        if el.label_height == 0 {
            return;
        }
        let m = &self.metrics;
        let mut line = 0;
        let mut push_line = |text: String, line: &mut i32| {
            let x = el.rect.center_x() - text_width(&text, m.char_width) / 2;
            batch.push(DrawPrimitive {
                rung: el.rung,
                role: DrawRole::Label,
                shape: Shape::Text {
                    origin: Point::new(x, el.rect.y + *line * m.char_height),
                    text,
                },
            });
            *line += 1;
        };
        push_line(instruction.label_text().to_string(), &mut line);
        if let Some(alias) = instruction.alias() {
            push_line(format!("<{alias}>"), &mut line);
        }
    }

    fn detail_line(&self, rung: u32, from: Point, to: Point) -> DrawPrimitive {
        DrawPrimitive {
            rung,
            role: DrawRole::SymbolDetail,
            shape: Shape::Line {
                from,
                to,
                dashed: false,
            },
        }
    }
}

fn text_width(text: &str, char_width: i32) -> i32 {
    text.chars().count() as i32 * char_width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::RecordingSink;
    use rrail_core::{SequenceModel, TokenRung};
    use rrail_layout::LayoutEngine;

    fn painted(texts: &[&str]) -> (RecordingSink, LayoutEngine) {
        let rungs: Vec<TokenRung> = texts.iter().map(|t| TokenRung::parse(t)).collect();
        let mut engine = LayoutEngine::new(LayoutMetrics::default());
        engine.layout_document(&rungs).unwrap();
        let painter = RungPainter::new(LayoutMetrics::default());
        let mut sink = RecordingSink::new();
        painter.paint_document(engine.iter(), &mut sink).unwrap();
        (sink, engine)
    }

    #[test]
    fn every_primitive_is_tagged_with_its_rung() {
        let (sink, _) = painted(&["XIC(A)OTE(B)", "XIC(C)"]);
        for rung in sink.rungs().collect::<Vec<_>>() {
            for primitive in sink.rung_primitives(rung) {
                assert_eq!(primitive.rung, rung);
            }
        }
    }

    #[test]
    fn painting_is_deterministic() {
        let (first, engine) = painted(&["XIC(A)[XIC(B),XIC(C)]OTE(D)"]);
        let painter = RungPainter::new(LayoutMetrics::default());
        let mut second = RecordingSink::new();
        painter.paint_document(engine.iter(), &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn repaint_replaces_the_previous_batch() {
        let (mut sink, engine) = painted(&["XIC(A)"]);
        let before = sink.rung_primitives(0).to_vec();
        let painter = RungPainter::new(LayoutMetrics::default());
        painter
            .paint_rung(engine.rung(0).unwrap(), &mut sink)
            .unwrap();
        assert_eq!(sink.rung_primitives(0), before.as_slice());
    }

    #[test]
    fn contact_emits_symbol_detail_and_label() {
        let (sink, _) = painted(&["XIO(Stop_PB)"]);
        let batch = sink.rung_primitives(0);
        assert!(batch.iter().any(|p| p.role == DrawRole::Symbol));
        // Normally closed renders one diagonal detail line.
        let details = batch
            .iter()
            .filter(|p| p.role == DrawRole::SymbolDetail)
            .count();
        assert_eq!(details, 1);
        assert!(batch.iter().any(|p| {
            p.role == DrawRole::Label
                && matches!(&p.shape, Shape::Text { text, .. } if text == "Stop_PB")
        }));
    }

    #[test]
    fn branch_emits_rails_and_connectors() {
        let (sink, _) = painted(&["XIC(A)[XIC(B),XIC(C)]OTE(D)"]);
        let batch = sink.rung_primitives(0);
        let connectors = batch
            .iter()
            .filter(|p| p.role == DrawRole::Connector)
            .count();
        assert_eq!(connectors, 3, "start, divider, end");
        assert!(batch.iter().any(|p| p.role == DrawRole::BranchRail));
        assert!(batch.iter().any(|p| p.role == DrawRole::BranchStub));
    }

    #[test]
    fn power_rails_span_the_rung() {
        let (sink, engine) = painted(&["XIC(A)"]);
        let geo = engine.rung(0).unwrap();
        let rails: Vec<_> = sink
            .rung_primitives(0)
            .iter()
            .filter(|p| p.role == DrawRole::PowerRail)
            .collect();
        assert_eq!(rails.len(), 2);
        for rail in rails {
            let Shape::Line { from, to, .. } = &rail.shape else {
                panic!("power rail must be a line");
            };
            assert_eq!(from.y, geo.top_y);
            assert_eq!(to.y, geo.bottom());
        }
    }

    #[test]
    fn comment_block_is_emitted_first() {
        let mut rung = TokenRung::parse("XIC(A)");
        rung.set_comment("seal-in circuit");
        let mut engine = LayoutEngine::new(LayoutMetrics::default());
        engine.layout_document(&[rung]).unwrap();
        let painter = RungPainter::new(LayoutMetrics::default());
        let mut sink = RecordingSink::new();
        painter.paint_document(engine.iter(), &mut sink).unwrap();
        assert_eq!(sink.rung_primitives(0)[0].role, DrawRole::Comment);
    }
}
