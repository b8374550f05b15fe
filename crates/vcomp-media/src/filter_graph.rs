//! Typed filter-graph representation and its FFmpeg rendering.
//!
//! Graph composition works on [`FilterStage`] values with explicit stream
//! labels. Turning them into `-filter_complex` syntax happens only in
//! [`FilterGraph::render`], which is also the only place that quotes or
//! escapes caller-controlled text.

use std::fmt;

/// Named stream endpoint, rendered as `[name]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamLabel(String);

impl StreamLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Video stream of the `index`-th `-i` input.
    pub fn input_video(index: usize) -> Self {
        Self(format!("{index}:v"))
    }

    /// Label name without brackets.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Inclusive time window during which a stage is enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Evaluate the predicate `start <= t <= end` for a non-empty window.
    pub fn contains(&self, t: f64) -> bool {
        !self.is_empty() && self.start <= t && t <= self.end
    }

    /// Empty when `start >= end`; such a window never enables its stage.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Render as a timeline-editing expression.
    fn expression(&self) -> String {
        if self.is_empty() {
            // Never true: keeps the stage in the graph but disabled for every frame.
            return "0".to_string();
        }
        format!("between(t,{},{})", self.start, self.end)
    }
}

/// One stage of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    /// Draw literal text onto a stream.
    DrawText {
        input: StreamLabel,
        output: StreamLabel,
        text: String,
        font_size: u32,
        font_color: String,
        x: u32,
        y: u32,
        window: TimeWindow,
    },
    /// Resize a stream.
    Scale {
        input: StreamLabel,
        output: StreamLabel,
        width: u32,
        height: u32,
    },
    /// Composite `overlay` on top of `base`.
    Overlay {
        base: StreamLabel,
        overlay: StreamLabel,
        output: StreamLabel,
        x: u32,
        y: u32,
        window: TimeWindow,
    },
    /// Forward a stream unchanged.
    Passthrough {
        input: StreamLabel,
        output: StreamLabel,
    },
}

impl FilterStage {
    /// Time window gating this stage, if any.
    pub fn window(&self) -> Option<TimeWindow> {
        match self {
            FilterStage::DrawText { window, .. } | FilterStage::Overlay { window, .. } => {
                Some(*window)
            }
            FilterStage::Scale { .. } | FilterStage::Passthrough { .. } => None,
        }
    }

    /// Render in `-filter_complex` syntax.
    pub fn render(&self) -> String {
        match self {
            FilterStage::DrawText {
                input,
                output,
                text,
                font_size,
                font_color,
                x,
                y,
                window,
            } => format!(
                "{input}drawtext=text={}:fontcolor={}:fontsize={font_size}:x={x}:y={y}:enable='{}'{output}",
                escape_drawtext(text),
                escape_graph(&escape_option(font_color)),
                window.expression(),
            ),
            FilterStage::Scale {
                input,
                output,
                width,
                height,
            } => format!("{input}scale={width}:{height}{output}"),
            FilterStage::Overlay {
                base,
                overlay,
                output,
                x,
                y,
                window,
            } => format!(
                "{base}{overlay}overlay={x}:{y}:enable='{}'{output}",
                window.expression()
            ),
            FilterStage::Passthrough { input, output } => format!("{input}null{output}"),
        }
    }
}

/// Ordered list of stages forming one filter graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    stages: Vec<FilterStage>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render as a semicolon-separated `-filter_complex` expression.
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::render)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Escape text for a `drawtext` `text=` option inside a filter graph.
///
/// FFmpeg unescapes three times: the graph parser, the option parser, then
/// drawtext's own expansion. Escaping is applied in the reverse order so
/// every character reaches drawtext literally.
pub fn escape_drawtext(text: &str) -> String {
    let expansion = backslash_escape(text, &['\\', '%']);
    escape_graph(&escape_option(&expansion))
}

/// Escape a value for the filter option parser.
///
/// The parser trims unescaped whitespace at both ends of a value, so edge
/// whitespace is escaped as well.
fn escape_option(value: &str) -> String {
    protect_edge_whitespace(&backslash_escape(value, &['\\', '\'', ':']))
}

/// Escape a filter description for the graph parser.
fn escape_graph(value: &str) -> String {
    backslash_escape(value, &['\\', '\'', '[', ']', ',', ';'])
}

const WHITESPACE: &[char] = &[' ', '\t', '\n', '\r'];

fn protect_edge_whitespace(value: &str) -> String {
    let start = value.len() - value.trim_start_matches(WHITESPACE).len();
    let end = start + value[start..].trim_end_matches(WHITESPACE).len();
    if start == 0 && end == value.len() {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 8);
    for c in value[..start].chars() {
        out.push('\\');
        out.push(c);
    }
    out.push_str(&value[start..end]);
    for c in value[end..].chars() {
        out.push('\\');
        out.push(c);
    }
    out
}

fn backslash_escape(value: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
