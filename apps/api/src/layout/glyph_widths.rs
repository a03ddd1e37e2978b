//! Coarse character-width buckets used for text fit decisions.
//!
//! Widths are relative glyph advances in font-size units: a string of `units = 4.0`
//! printed at 5mm is roughly 20mm wide. This is not real font measurement. The
//! buckets only need to keep their relative ordering (space cheapest, narrow glyphs
//! cheap, wide glyphs most expensive, everything else mid-weight) for the fit search
//! to behave sensibly.

// ────────────────────────────────────────────────────────────────────────────
// Width table
// ────────────────────────────────────────────────────────────────────────────

/// Bucketed per-character width weights.
///
/// Characters are looked up in order: space, narrow set, wide set, medium set,
/// falling back to `default` for anything else (including non-ASCII).
#[derive(Debug, Clone, PartialEq)]
pub struct CharWidthTable {
    pub space: f64,
    pub narrow: f64,
    pub wide: f64,
    pub medium: f64,
    pub default: f64,
    pub narrow_set: String,
    pub wide_set: String,
    pub medium_set: String,
}

impl CharWidthTable {
    /// Width weight of a single character.
    pub fn char_factor(&self, ch: char) -> f64 {
        if ch == ' ' {
            self.space
        } else if self.narrow_set.contains(ch) {
            self.narrow
        } else if self.wide_set.contains(ch) {
            self.wide
        } else if self.medium_set.contains(ch) {
            self.medium
        } else {
            self.default
        }
    }

    /// Sum of `char_factor` over the string, left to right.
    pub fn units(&self, s: &str) -> f64 {
        s.chars().map(|c| self.char_factor(c)).sum()
    }

    /// Approximate printed width of `line` at `text_size`, in the same unit as the size.
    pub fn line_width(&self, line: &str, text_size: f64) -> f64 {
        text_size * self.units(line)
    }
}

impl Default for CharWidthTable {
    fn default() -> Self {
        Self {
            space: 0.35,
            narrow: 0.36,
            wide: 0.98,
            medium: 0.75,
            default: 0.62,
            narrow_set: "Il1|".to_string(),
            wide_set: "WM".to_string(),
            medium_set: "AVYXK".to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_bucket_values() {
        let t = CharWidthTable::default();
        assert_eq!(t.char_factor(' '), 0.35);
        for c in ['I', 'l', '1', '|'] {
            assert_eq!(t.char_factor(c), 0.36, "narrow bucket for {c:?}");
        }
        for c in ['W', 'M'] {
            assert_eq!(t.char_factor(c), 0.98, "wide bucket for {c:?}");
        }
        for c in ['A', 'V', 'Y', 'X', 'K'] {
            assert_eq!(t.char_factor(c), 0.75, "medium bucket for {c:?}");
        }
        for c in ['a', 'm', 'B', '0', '…', 'é'] {
            assert_eq!(t.char_factor(c), 0.62, "default bucket for {c:?}");
        }
    }

    #[test]
    fn test_bucket_ordering() {
        let t = CharWidthTable::default();
        assert!(t.space < t.narrow);
        assert!(t.narrow < t.default);
        assert!(t.default < t.medium);
        assert!(t.medium < t.wide);
    }

    #[test]
    fn test_units_empty_is_zero() {
        assert_eq!(CharWidthTable::default().units(""), 0.0);
    }

    #[test]
    fn test_units_sums_characters() {
        let t = CharWidthTable::default();
        // C(0.62) + A(0.75) + T(0.62)
        assert!(approx(t.units("CAT"), 1.99));
        // W(0.98) + space(0.35) + I(0.36)
        assert!(approx(t.units("W I"), 1.69));
    }

    #[test]
    fn test_line_width_scales_with_size() {
        let t = CharWidthTable::default();
        assert!(approx(t.line_width("CAT", 8.0), 8.0 * 1.99));
        assert_eq!(t.line_width("CAT", 0.0), 0.0);
    }
}
