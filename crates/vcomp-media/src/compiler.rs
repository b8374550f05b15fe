//! Overlay timeline compiler.
//!
//! Maps the base frame geometry and an ordered overlay list to the extra
//! FFmpeg inputs, a filter graph, and the label of the final video stream.
//! The result is a pure function of its inputs.

use std::path::PathBuf;

use tracing::warn;
use vcomp_models::{AssetResolver, FrameGeometry, Overlay, OverlayKind};

use crate::filter_graph::{FilterGraph, FilterStage, StreamLabel, TimeWindow};

/// Smallest font size drawn, in pixels.
pub const MIN_FONT_SIZE: u32 = 16;

/// Text colour for drawn text.
pub const TEXT_COLOR: &str = "white";

/// An overlay left out of the graph because its asset could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOverlay {
    /// Position in the submitted list
    pub index: usize,
    /// The unresolved asset reference
    pub reference: String,
}

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGraph {
    /// Extra inputs after the base video, in `-i` order (input 1, 2, ...)
    pub inputs: Vec<PathBuf>,
    /// Stage list
    pub graph: FilterGraph,
    /// Rendered `-filter_complex` expression, never empty
    pub filter_complex: String,
    /// Label to pass to `-map`
    pub output_label: StreamLabel,
    /// Overlays dropped for missing assets
    pub skipped: Vec<SkippedOverlay>,
}

/// Compile an overlay timeline into a filter graph.
pub fn compile(
    geometry: &FrameGeometry,
    overlays: &[Overlay],
    assets: &dyn AssetResolver,
) -> CompiledGraph {
    let mut graph = FilterGraph::new();
    let mut inputs = Vec::new();
    let mut skipped = Vec::new();
    let mut current = StreamLabel::input_video(0);

    for (i, overlay) in overlays.iter().enumerate() {
        let x = geometry.px_x(overlay.x);
        let y = geometry.px_y(overlay.y);
        let window = TimeWindow::new(overlay.start_time, overlay.end_time);
        let next = StreamLabel::new(format!("v{}", i + 1));

        match overlay.kind {
            OverlayKind::Text => {
                graph.push(FilterStage::DrawText {
                    input: current,
                    output: next.clone(),
                    text: overlay.content.clone(),
                    font_size: font_size(geometry, overlay),
                    font_color: TEXT_COLOR.to_string(),
                    x,
                    y,
                    window,
                });
            }
            OverlayKind::Image | OverlayKind::Clip => {
                let Some(path) = assets.resolve(&overlay.content) else {
                    warn!(
                        index = i,
                        kind = overlay.kind.as_str(),
                        reference = %overlay.content,
                        "Overlay asset missing, skipping overlay"
                    );
                    skipped.push(SkippedOverlay {
                        index: i,
                        reference: overlay.content.clone(),
                    });
                    continue;
                };

                inputs.push(path);
                let scaled = StreamLabel::new(format!("sc{i}"));

                graph.push(FilterStage::Scale {
                    input: StreamLabel::input_video(inputs.len()),
                    output: scaled.clone(),
                    width: geometry.even_width(overlay.width_fraction()),
                    height: geometry.even_height(overlay.height_fraction()),
                });
                graph.push(FilterStage::Overlay {
                    base: current,
                    overlay: scaled,
                    output: next.clone(),
                    x,
                    y,
                    window,
                });
            }
        }

        current = next;
    }

    if graph.is_empty() {
        let output = StreamLabel::new("v0");
        graph.push(FilterStage::Passthrough {
            input: current,
            output: output.clone(),
        });
        current = output;
    }

    CompiledGraph {
        inputs,
        filter_complex: graph.render(),
        graph,
        output_label: current,
        skipped,
    }
}

fn font_size(geometry: &FrameGeometry, overlay: &Overlay) -> u32 {
    let px = (overlay.height_fraction() * geometry.height as f64).floor();
    if px.is_finite() && px > MIN_FONT_SIZE as f64 {
        px as u32
    } else {
        MIN_FONT_SIZE
    }
}
