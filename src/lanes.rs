//! Geometry for the "closing lanes" effect played on the way to the writing
//! page: three vertical dividers, exposed to CSS as `--line-1` through
//! `--line-3`, slide from evenly spaced positions to the writing layout's
//! gridlines.

/// The custom properties driven by the animation, in lane order.
pub const LANE_PROPERTIES: [&str; 3] = ["--line-1", "--line-2", "--line-3"];

/// Cubic ease-in-out over `t` in `[0, 1]`.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// One sample of the animation.
#[derive(Clone, Debug, PartialEq)]
pub enum LaneFrame {
    /// Interpolated pixel positions while the animation runs.
    Moving([f64; 3]),

    /// The exact end state. Written as literal CSS values rather than the
    /// last interpolated sample so no rounding drift is left behind.
    Settled {
        first_gridline_px: f64,
        center_px: f64,
    },
}

impl LaneFrame {
    pub fn is_settled(&self) -> bool {
        matches!(self, LaneFrame::Settled { .. })
    }

    /// Renders the frame as `(property, value)` pairs ready for
    /// `style.setProperty`.
    pub fn custom_properties(&self) -> [(&'static str, String); 3] {
        let [p1, p2, p3] = LANE_PROPERTIES;
        match self {
            LaneFrame::Moving([l1, l2, l3]) => [
                (p1, format!("{}px", l1)),
                (p2, format!("{}px", l2)),
                (p3, format!("{}px", l3)),
            ],
            LaneFrame::Settled {
                first_gridline_px,
                center_px,
            } => [
                (p1, String::from("-5%")),
                (p2, format!("{}px", first_gridline_px)),
                (p3, format!("{}px", center_px)),
            ],
        }
    }
}

/// A lane animation sized for one page frame.
#[derive(Clone, Debug)]
pub struct LaneAnimation {
    start: [f64; 3],
    end: [f64; 3],
    first_gridline_px: f64,
    center_px: f64,
    duration_ms: f64,
}

impl LaneAnimation {
    /// Lanes start at a quarter, half, and three quarters of `frame_width`
    /// and end just off the left edge, on the first gridline, and on the
    /// frame's center respectively.
    pub fn new(frame_width: f64, first_gridline_px: f64, duration_ms: f64) -> LaneAnimation {
        let center_px = frame_width * 0.5;
        LaneAnimation {
            start: [frame_width * 0.25, frame_width * 0.5, frame_width * 0.75],
            end: [frame_width * -0.05, first_gridline_px, center_px],
            first_gridline_px,
            center_px,
            duration_ms,
        }
    }

    /// The horizontal offset handed to the writing page's layout once the
    /// lanes have closed.
    pub fn center_px(&self) -> f64 {
        self.center_px
    }

    /// Linear progress in `[0, 1]` after `elapsed_ms`.
    pub fn progress(&self, elapsed_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Samples the animation `elapsed_ms` after its first frame.
    pub fn frame(&self, elapsed_ms: f64) -> LaneFrame {
        let t = self.progress(elapsed_ms);
        if t >= 1.0 {
            return LaneFrame::Settled {
                first_gridline_px: self.first_gridline_px,
                center_px: self.center_px,
            };
        }
        let eased = ease_in_out_cubic(t);
        let mut lanes = [0.0; 3];
        for (lane, (start, end)) in lanes.iter_mut().zip(self.start.iter().zip(self.end.iter())) {
            *lane = start + (end - start) * eased;
        }
        LaneFrame::Moving(lanes)
    }
}
