//! Text layout for two-line frames.
//!
//! The panel mirrors a 16×2 character display: a heading line and a value
//! line, optionally separated by a horizontal rule.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          FLOW RATE:          │  ← top_y
//! │ ──────────────────────────── │  ← separator_y
//! │         12.50 L/min          │  ← bottom_y
//! └──────────────────────────────┘
//! ```

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Alignment, Text},
};

use aquameter::accounting::Frame;

// ── TextLayout ───────────────────────────────────────────────────────────

/// Geometry for [`render_frame()`].
///
/// [`TextLayout::default()`] fits a 128×64 panel with FONT_6X10, which
/// holds 21 characters per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLayout {
    /// Panel width in pixels. Default: 128.
    pub display_width: u32,
    /// Baseline of the heading line. Default: 22.
    pub top_y: i32,
    /// Baseline of the value line. Default: 46.
    pub bottom_y: i32,
    /// Row of the rule between the lines; `None` draws no rule. Default: 30.
    pub separator_y: Option<i32>,
    /// Centre both lines horizontally instead of left-aligning them.
    /// Default: `true`.
    pub centered: bool,
    /// Left margin used when `centered` is `false`. Default: 2.
    pub left_margin: i32,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            display_width: 128,
            top_y: 22,
            bottom_y: 46,
            separator_y: Some(30),
            centered: true,
            left_margin: 2,
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Draw `frame` into `display` using `layout`. Empty lines are skipped.
///
/// The rule is drawn only when both lines carry text, so single-line
/// frames such as the date header stay uncluttered.
pub fn render_frame<D>(display: &mut D, frame: &Frame, layout: &TextLayout) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let (x, alignment) = if layout.centered {
        (layout.display_width as i32 / 2, Alignment::Center)
    } else {
        (layout.left_margin, Alignment::Left)
    };

    for (text, y) in [(frame.top(), layout.top_y), (frame.bottom(), layout.bottom_y)] {
        if !text.is_empty() {
            Text::with_alignment(text, Point::new(x, y), text_style, alignment).draw(display)?;
        }
    }

    if let Some(y) = layout.separator_y {
        if !frame.top().is_empty() && !frame.bottom().is_empty() {
            let end = layout.display_width as i32 - 1;
            Line::new(Point::new(0, y), Point::new(end, y))
                .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
                .draw(display)?;
        }
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────
