use serde::{Deserialize, Serialize};

/// Gap between the panel, its anchor and the viewport edges.
pub const DEFAULT_PADDING: f64 = 8.0;

/// Bounding box of a link, captured when the hover started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl AnchorRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Panel size used for placement. The height is an estimate; the rendered
/// panel may be shorter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PanelSize {
    fn default() -> Self {
        Self {
            width: 280.0,
            height: 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopoverPosition {
    pub left: f64,
    pub top: f64,
    pub side: Side,
}

/// Prefers the space above the anchor and flips below when the panel would
/// clip the top edge. Horizontally centred, then clamped to the viewport.
pub fn place_popover(
    anchor: &AnchorRect,
    viewport: &Viewport,
    panel: &PanelSize,
    padding: f64,
) -> PopoverPosition {
    let max_left = viewport.width - panel.width - padding;
    let left = (anchor.center_x() - panel.width / 2.0)
        .min(max_left)
        .max(padding);

    let above = anchor.top - panel.height - padding;
    let (top, side) = if above < padding {
        let max_top = viewport.height - panel.height - padding;
        let below = (anchor.bottom() + padding).min(max_top).max(padding);
        (below, Side::Below)
    } else {
        (above, Side::Above)
    };

    PopoverPosition { left, top, side }
}
