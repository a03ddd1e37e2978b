//! Balanced line wrapping.
//!
//! Splits one logical string into exactly `count` lines, minimizing the widest
//! resulting line (by `CharWidthTable::units`), not the word count per line.
//! Word boundaries are used when there are enough words; otherwise the split
//! falls back to character positions.

use crate::layout::glyph_widths::CharWidthTable;

/// Splits `text` into exactly `count` lines.
///
/// - `count <= 1`: the text unchanged.
/// - at least `count` whitespace-delimited words: split between words, words on
///   one line re-joined with a single space.
/// - otherwise: split by character position. Text with `count` characters or
///   fewer is returned whole followed by empty lines.
pub fn wrap(text: &str, count: usize, table: &CharWidthTable) -> Vec<String> {
    if count <= 1 {
        return vec![text.to_string()];
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() >= count {
        split_words(&words, count, table)
    } else {
        split_chars(text, count, table)
    }
}

fn split_words(words: &[&str], count: usize, table: &CharWidthTable) -> Vec<String> {
    let cost = |start: usize, end: usize| table.units(&words[start..end].join(" "));
    let cuts = minimax_cuts(words.len(), count, cost);
    segments(&cuts, words.len())
        .map(|(start, end)| words[start..end].join(" "))
        .collect()
}

fn split_chars(text: &str, count: usize, table: &CharWidthTable) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= count {
        let mut lines = vec![text.to_string()];
        lines.resize(count, String::new());
        return lines;
    }
    let cost = |start: usize, end: usize| {
        chars[start..end]
            .iter()
            .map(|&c| table.char_factor(c))
            .sum::<f64>()
    };
    let cuts = minimax_cuts(chars.len(), count, cost);
    segments(&cuts, chars.len())
        .map(|(start, end)| chars[start..end].iter().collect())
        .collect()
}

/// Turns cut positions into `(start, end)` atom ranges covering `0..atoms`.
fn segments(cuts: &[usize], atoms: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let starts = std::iter::once(0).chain(cuts.iter().copied());
    let ends = cuts.iter().copied().chain(std::iter::once(atoms));
    starts.zip(ends)
}

/// Chooses `parts - 1` cut positions splitting `atoms` items into `parts` non-empty
/// contiguous groups so that the largest group cost is minimal.
///
/// Among optimal partitions the lexicographically earliest cut sequence wins, which
/// is the one a nested left-to-right enumeration with a strict `<` finds first.
/// `best[r][j]` holds the optimum for splitting atoms `j..` into `r` groups; the
/// reconstruction then takes, at each step, the first cut that can still reach the
/// global optimum.
///
/// Requires `atoms >= parts`.
fn minimax_cuts(atoms: usize, parts: usize, cost: impl Fn(usize, usize) -> f64) -> Vec<usize> {
    if parts <= 1 {
        return Vec::new();
    }

    let mut best = vec![vec![f64::INFINITY; atoms + 1]; parts + 1];
    for (j, slot) in best[1].iter_mut().enumerate().take(atoms) {
        *slot = cost(j, atoms);
    }
    for r in 2..=parts {
        for j in 0..atoms {
            if atoms - j < r {
                continue;
            }
            let mut value = f64::INFINITY;
            for i in j + 1..=atoms - r + 1 {
                let candidate = cost(j, i).max(best[r - 1][i]);
                if candidate < value {
                    value = candidate;
                }
            }
            best[r][j] = value;
        }
    }

    let target = best[parts][0];
    let mut cuts = Vec::with_capacity(parts - 1);
    let mut start = 0;
    for r in (2..=parts).rev() {
        let cut = (start + 1..=atoms - r + 1)
            .find(|&i| cost(start, i) <= target && best[r - 1][i] <= target)
            .unwrap_or(start + 1);
        cuts.push(cut);
        start = cut;
    }
    cuts
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CharWidthTable {
        CharWidthTable::default()
    }

    /// Nested enumeration in lexicographic cut order keeping the first strict minimum.
    fn brute_force(atoms: usize, parts: usize, cost: &dyn Fn(usize, usize) -> f64) -> Vec<usize> {
        fn walk(
            start: usize,
            remaining: usize,
            atoms: usize,
            cuts: &mut Vec<usize>,
            cost: &dyn Fn(usize, usize) -> f64,
            best: &mut Option<(f64, Vec<usize>)>,
        ) {
            if remaining == 1 {
                let mut bounds = vec![0];
                bounds.extend(cuts.iter().copied());
                bounds.push(atoms);
                let score = bounds
                    .windows(2)
                    .map(|w| cost(w[0], w[1]))
                    .fold(f64::NEG_INFINITY, f64::max);
                if best.as_ref().map_or(true, |(s, _)| score < *s) {
                    *best = Some((score, cuts.clone()));
                }
                return;
            }
            for i in start + 1..=atoms - remaining + 1 {
                cuts.push(i);
                walk(i, remaining - 1, atoms, cuts, cost, best);
                cuts.pop();
            }
        }
        let mut best = None;
        walk(0, parts, atoms, &mut Vec::new(), cost, &mut best);
        best.map(|(_, cuts)| cuts).unwrap_or_default()
    }

    #[test]
    fn test_wrap_single_line_returns_input() {
        assert_eq!(wrap("HELLO WORLD", 1, &table()), vec!["HELLO WORLD"]);
        assert_eq!(wrap("HELLO WORLD", 0, &table()), vec!["HELLO WORLD"]);
    }

    #[test]
    fn test_wrap_two_words_two_lines_splits_at_boundary() {
        assert_eq!(wrap("HELLO WORLD", 2, &table()), vec!["HELLO", "WORLD"]);
    }

    #[test]
    fn test_wrap_collapses_whitespace_between_words() {
        assert_eq!(wrap("HELLO   BIG\tWORLD", 3, &table()), vec!["HELLO", "BIG", "WORLD"]);
    }

    #[test]
    fn test_wrap_balances_width_not_word_count() {
        // MMMM = 3.92 units, "a a a" = 2.56 units; two-and-two would leave
        // "MMMM a" at 4.89.
        assert_eq!(wrap("MMMM a a a", 2, &table()), vec!["MMMM", "a a a"]);
    }

    #[test]
    fn test_wrap_falls_back_to_characters_without_spaces() {
        // A|BCD = 1.86, AB|CD = 1.37, ABC|D = 1.99
        assert_eq!(wrap("ABCD", 2, &table()), vec!["AB", "CD"]);
    }

    #[test]
    fn test_wrap_falls_back_to_characters_with_too_few_words() {
        let lines = wrap("HELLO WORLD", 3, &table());
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| !l.is_empty()));
        assert_eq!(lines.concat(), "HELLO WORLD");
    }

    #[test]
    fn test_wrap_short_text_pads_with_empty_lines() {
        assert_eq!(wrap("AB", 3, &table()), vec!["AB", "", ""]);
        assert_eq!(wrap("ABC", 3, &table()), vec!["ABC", "", ""]);
    }

    #[test]
    fn test_wrap_tie_prefers_earliest_cut() {
        // a|aa and aa|a both peak at 1.24 units.
        assert_eq!(wrap("aaa", 2, &table()), vec!["a", "aa"]);
        // Four equal words into two lines: only the middle split is optimal.
        assert_eq!(wrap("ab ab ab ab", 2, &table()), vec!["ab ab", "ab ab"]);
    }

    #[test]
    fn test_wrap_counts_characters_not_bytes() {
        let lines = wrap("ÄÖÜß", 2, &table());
        assert_eq!(lines, vec!["ÄÖ", "Üß"]);
    }

    #[test]
    fn test_minimax_matches_exhaustive_enumeration() {
        let t = table();
        let samples = [
            "THE QUICK BROWN FOX JUMPS",
            "Wild Mountain Yak Xylophone",
            "a bb ccc dddd eeeee ffffff",
            "MIW lil MWM IlI WWW",
            "x x x x x x x",
            "KEYCHAIN",
            "WWWWIIIIMMMMllll",
        ];
        for sample in samples {
            let words: Vec<&str> = sample.split_whitespace().collect();
            let chars: Vec<char> = sample.chars().collect();
            for parts in 2..=4 {
                if words.len() >= parts {
                    let cost = |a: usize, b: usize| t.units(&words[a..b].join(" "));
                    assert_eq!(
                        minimax_cuts(words.len(), parts, cost),
                        brute_force(words.len(), parts, &cost),
                        "word split of {sample:?} into {parts}"
                    );
                }
                if chars.len() > parts {
                    let cost = |a: usize, b: usize| {
                        chars[a..b].iter().map(|&c| t.char_factor(c)).sum::<f64>()
                    };
                    assert_eq!(
                        minimax_cuts(chars.len(), parts, cost),
                        brute_force(chars.len(), parts, &cost),
                        "char split of {sample:?} into {parts}"
                    );
                }
            }
        }
    }
}
