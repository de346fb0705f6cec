#![forbid(unsafe_code)]

//! Draw-primitive emission.
//!
//! The engine never touches pixels: [`RungPainter`] walks committed
//! [`rrail_layout::RungGeometry`] and emits an ordered stream of tagged
//! primitives to a host-provided [`RenderSink`]. Every primitive carries its
//! rung number, so clearing rung N removes exactly the primitives emitted
//! for rung N in the previous pass and nothing else.

pub mod painter;
pub mod primitives;

pub use painter::RungPainter;
pub use primitives::{DrawPrimitive, DrawRole, RecordingSink, RenderSink, Shape};
