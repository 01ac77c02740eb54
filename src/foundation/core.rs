use serde::{Deserialize, Serialize};

/// Integer page-pixel rectangle. Origin is the top-left page corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PxRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PxRect {
    /// Create a rectangle from origin and size.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Largest absolute difference between corresponding edges of `self` and `other`.
    pub fn max_edge_deviation(self, other: PxRect) -> u32 {
        [
            self.x.abs_diff(other.x),
            self.y.abs_diff(other.y),
            self.right().abs_diff(other.right()),
            self.bottom().abs_diff(other.bottom()),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Return `true` when `inner` lies inside `self` grown by `tolerance` pixels on every side.
    pub fn contains_within(self, inner: PxRect, tolerance: u32) -> bool {
        inner.x.saturating_add(tolerance) >= self.x
            && inner.y.saturating_add(tolerance) >= self.y
            && inner.right() <= self.right().saturating_add(tolerance)
            && inner.bottom() <= self.bottom().saturating_add(tolerance)
    }

    /// Return `true` when the rectangles share interior pixels. Touching edges do not count.
    pub fn intersects(self, other: PxRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Convert to `[x, y, width, height]`.
    pub fn to_xywh(self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Fractional rectangle used before a backend snaps coordinates to the pixel grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FRect {
    /// Translate by an integer pixel origin.
    pub fn offset(self, origin_x: u32, origin_y: u32) -> Self {
        Self {
            x: self.x + f64::from(origin_x),
            y: self.y + f64::from(origin_y),
            ..self
        }
    }
}

/// Per-edge pixel insets (page margins).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edges {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Edges {
    /// Same inset on every edge.
    pub const fn uniform(v: u32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

/// Rule a backend uses to snap fractional coordinates to integer pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapRule {
    /// Round half up on every edge.
    #[default]
    RoundHalfUp,
    /// Grow outward: floor leading edges, ceil trailing edges.
    Outward,
}

impl SnapRule {
    /// Snap a fractional rectangle. Negative coordinates clamp to zero.
    pub fn snap(self, r: FRect) -> PxRect {
        let (x0, y0, x1, y1) = match self {
            Self::RoundHalfUp => (
                round_half_up(r.x),
                round_half_up(r.y),
                round_half_up(r.x + r.w),
                round_half_up(r.y + r.h),
            ),
            Self::Outward => (
                r.x.floor(),
                r.y.floor(),
                (r.x + r.w).ceil(),
                (r.y + r.h).ceil(),
            ),
        };
        let x0 = to_px(x0);
        let y0 = to_px(y0);
        let x1 = to_px(x1).max(x0);
        let y1 = to_px(y1).max(y0);
        PxRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Round half up (`2.5 -> 3`, `-2.5 -> -2`). This is the only rounding rule used for layout.
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Convert a non-negative integral float to pixels, clamping negatives and NaN to zero.
pub fn to_px(v: f64) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else if v >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        v as u32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
