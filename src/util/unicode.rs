use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal cells a string occupies. Line breaks and tabs in a cell are shown
/// as one space each.
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

fn grapheme_width(g: &str) -> usize {
    match g {
        "\t" | "\n" | "\r\n" => 1,
        _ => UnicodeWidthStr::width(g),
    }
}

/// Fit a value into a table cell of exactly `width` cells: control
/// whitespace flattened, truncated with `…` when too wide, padded on the
/// right when too narrow.
pub fn fit_cell(s: &str, width: usize) -> String {
    let flat: String = s
        .graphemes(true)
        .map(|g| match g {
            "\t" | "\n" | "\r\n" => " ",
            other => other,
        })
        .collect();

    let mut out = if display_width(&flat) <= width {
        flat
    } else if width == 0 {
        String::new()
    } else {
        let budget = width - 1;
        let mut used = 0;
        let mut cut = String::new();
        for g in flat.graphemes(true) {
            let w = grapheme_width(g);
            if used + w > budget {
                break;
            }
            used += w;
            cut.push_str(g);
        }
        cut.push('\u{2026}');
        cut
    };
    let pad = width.saturating_sub(display_width(&out));
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_wide_and_combining_text() {
        assert_eq!(display_width("Milk"), 4);
        assert_eq!(display_width("牛乳"), 4);
        assert_eq!(display_width("cafe\u{0301}"), 4);
        assert_eq!(display_width("a\tb"), 3);
    }

    #[test]
    fn short_values_are_padded() {
        assert_eq!(fit_cell("ab", 4), "ab  ");
        assert_eq!(fit_cell("", 2), "  ");
    }

    #[test]
    fn long_values_are_truncated() {
        assert_eq!(fit_cell("abcdef", 4), "abc\u{2026}");
        // A wide char that does not fit leaves a pad cell
        assert_eq!(fit_cell("a牛乳", 3), "a\u{2026} ");
        assert_eq!(fit_cell("abc", 0), "");
    }

    #[test]
    fn newlines_are_flattened() {
        assert_eq!(fit_cell("two\nlines", 9), "two lines");
    }
}
