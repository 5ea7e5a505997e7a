//! Positions a page's text region so that its top edge lines up with the top of
//! the illustration. The page frame is `position: relative`, so absolutely
//! positioned children are offset from its padding box, i.e. from the frame's
//! top plus its top border.

/// Which region is aligned, and how far above the illustration's top its
/// content starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentRule {
    /// Selector for the illustration media.
    pub illustration: &'static str,

    /// Selector for the region whose `top` is set.
    pub target: &'static str,

    /// Pixels subtracted from the offset, e.g. for padding on the region's
    /// first child.
    pub adjust_px: f64,
}

/// The home page's text columns.
pub const HOME: AlignmentRule = AlignmentRule {
    illustration: ".illustration img, .illustration video",
    target: ".text-columns",
    adjust_px: 0.0,
};

/// The writing page's article list. Entries carry 4px of top padding, so the
/// list sits that much higher to put the first title on the line.
pub const WRITING: AlignmentRule = AlignmentRule {
    illustration: ".writing-page .illustration img",
    target: ".article-list",
    adjust_px: 4.0,
};

/// Measurements taken from the live layout, all viewport-relative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurements {
    pub frame_top: f64,
    pub frame_border_top: f64,
    pub illustration_top: f64,
}

/// The `top` to apply to `rule.target`, in pixels. Pure, so re-running it
/// without a layout change always yields the same value.
pub fn aligned_top(m: Measurements, rule: &AlignmentRule) -> f64 {
    m.illustration_top - (m.frame_top + m.frame_border_top) - rule.adjust_px
}

/// Parses a computed `border-top-width` such as `"2px"`. Anything unparseable
/// counts as no border.
pub fn parse_px(value: &str) -> f64 {
    value
        .trim()
        .trim_end_matches("px")
        .trim()
        .parse::<f64>()
        .map(f64::trunc)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod test {
    use super::*;

    const M: Measurements = Measurements {
        frame_top: 40.0,
        frame_border_top: 2.0,
        illustration_top: 180.5,
    };

    #[test]
    fn test_home_offset_is_relative_to_padding_box() {
        assert_eq!(138.5, aligned_top(M, &HOME));
    }

    #[test]
    fn test_writing_offset_subtracts_entry_padding() {
        assert_eq!(134.5, aligned_top(M, &WRITING));
    }

    #[test]
    fn test_repeated_alignment_is_stable() {
        let first = aligned_top(M, &HOME);
        for _ in 0..5 {
            assert_eq!(first, aligned_top(M, &HOME));
        }
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(2.0, parse_px("2px"));
        assert_eq!(1.0, parse_px("1.5px"));
        assert_eq!(0.0, parse_px(""));
        assert_eq!(0.0, parse_px("medium"));
    }
}
