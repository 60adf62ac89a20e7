//! SVG flamegraph and terminal summary generation.
//!
//! Rendering is delegated to inferno, fed with the folded lines produced by
//! the stack builder. Frames are identifiers, widths are self time.

use crate::aggregator::{CollapsedStack, HotFunction, TimeDistribution};
use crate::utils::config::{DEFAULT_COUNT_NAME, DEFAULT_FLAMEGRAPH_TITLE, DEFAULT_FLAMEGRAPH_WIDTH};
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::color::{BasicPalette, Palette};
use inferno::flamegraph::{self, Direction, Options};
use log::{debug, info};

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
    /// Unit shown in frame tooltips
    pub count_name: String,
    /// Draw as an icicle graph, roots at the top
    pub inverted: bool,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_FLAMEGRAPH_TITLE.to_string(),
            width: DEFAULT_FLAMEGRAPH_WIDTH,
            count_name: DEFAULT_COUNT_NAME.to_string(),
            inverted: false,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_count_name(mut self, count_name: impl Into<String>) -> Self {
        self.count_name = count_name.into();
        self
    }

    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    fn to_options(&self) -> Options<'static> {
        let mut options = Options::default();
        options.title = self.title.clone();
        options.count_name = self.count_name.clone();
        options.image_width = Some(self.width);
        options.colors = Palette::Basic(BasicPalette::Hot);
        if self.inverted {
            options.direction = Direction::Inverted;
        }
        options
    }
}

/// Generate SVG flamegraph from collapsed stacks
///
/// **Public** - main entry point for flamegraph rendering
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - Nothing to draw
/// * `FlamegraphError::RenderFailed` - inferno rejected the input
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let lines: Vec<String> = stacks.iter().map(CollapsedStack::to_line).collect();
    let mut options = config.to_options();
    let mut svg = Vec::new();

    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::RenderFailed(e.to_string()))?;

    let svg = String::from_utf8(svg)?;
    debug!("Flamegraph rendered ({} bytes)", svg.len());
    Ok(svg)
}

/// Create a text summary of the hottest functions for the terminal
///
/// # Arguments
/// * `hot_functions` - Flat profile, already sorted
/// * `distribution` - Statistics over the collapsed stacks
/// * `max_lines` - Table rows to print
pub fn generate_text_summary(
    hot_functions: &[HotFunction],
    distribution: &TimeDistribution,
    max_lines: usize,
) -> String {
    let mut lines = Vec::new();

    lines.push("  HOT FUNCTIONS (by self time)".to_string());
    lines.push(format!("  ┏{}┳{}┳{}┳{}┳{}┓", bar(42), bar(10), bar(14), bar(14), bar(9)));
    lines.push(format!(
        "  ┃ {:<40} ┃ {:^8} ┃ {:^12} ┃ {:^12} ┃ {:^7} ┃",
        "Function", "CALLS", "TOTAL", "SELF", "%"
    ));
    lines.push(format!("  ┣{}╋{}╋{}╋{}╋{}┫", bar(42), bar(10), bar(14), bar(14), bar(9)));

    for function in hot_functions.iter().take(max_lines) {
        lines.push(format!(
            "  ┃ {:<40} ┃ {:>8} ┃ {:>12} ┃ {:>12} ┃ {:>6.1}% ┃",
            truncate(&function.function, 40),
            function.calls,
            function.total_time,
            function.self_time,
            function.self_percentage
        ));
    }
    lines.push(format!("  ┗{}┻{}┻{}┻{}┻{}┛", bar(42), bar(10), bar(14), bar(14), bar(9)));

    if hot_functions.len() > max_lines {
        lines.push(format!(
            "   (Showing top {} of {} functions)",
            max_lines,
            hot_functions.len()
        ));
    }

    lines.push(String::new());
    lines.push(format!("  {}", distribution.summary()));
    if distribution.is_highly_concentrated() {
        lines.push("  Most of the time is spent in a handful of stacks".to_string());
    }

    lines.join("\n")
}

fn bar(width: usize) -> String {
    "━".repeat(width)
}

/// Keep the tail of long names, where the distinguishing part usually is
fn truncate(name: &str, max_chars: usize) -> String {
    let count = name.chars().count();
    if count <= max_chars {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (max_chars - 3)).collect();
    format!("...{}", tail)
}
