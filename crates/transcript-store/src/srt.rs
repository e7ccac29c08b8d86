use crate::types::TextUnit;

/// `HH:MM:SS,mmm` (or `MM:SS,mmm` when `always_include_hours` is false and
/// there are no whole hours). Milliseconds are rounded, not truncated.
pub fn format_timestamp(seconds: f64, always_include_hours: bool, decimal_marker: &str) -> String {
    assert!(seconds >= 0.0, "non-negative timestamp expected");

    let mut milliseconds = (seconds * 1000.0).round() as i64;

    let hours = milliseconds / 3_600_000;
    milliseconds -= hours * 3_600_000;

    let minutes = milliseconds / 60_000;
    milliseconds -= minutes * 60_000;

    let secs = milliseconds / 1_000;
    milliseconds -= secs * 1_000;

    let hours_marker = if always_include_hours || hours > 0 {
        format!("{hours:02}:")
    } else {
        String::new()
    };

    format!("{hours_marker}{minutes:02}:{secs:02}{decimal_marker}{milliseconds:03}")
}

/// Breaks `line` at the last space before `length`, splitting as close to
/// evenly as possible. Leaves the line untouched if there is no space to
/// break at.
pub fn break_line(line: &str, length: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut break_index = (chars.len() / 2).min(length);

    while break_index > 1 {
        if chars[break_index - 1] == ' ' {
            break;
        }
        break_index -= 1;
    }

    if break_index > 1 {
        let head: String = chars[..break_index - 1].iter().collect();
        let tail: String = chars[break_index..].iter().collect();
        format!("{head}\n{tail}")
    } else {
        line.to_string()
    }
}

/// Collapses any run of one or more `-` immediately followed by `>` into a
/// single `->`, so stray arrow-like sequences in transcribed text don't
/// collide with the SRT arrow separator.
fn collapse_arrows(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '-' {
            let start = i;
            while i < chars.len() && chars[i] == '-' {
                i += 1;
            }
            if i < chars.len() && chars[i] == '>' {
                out.push_str("->");
                i += 1;
            } else {
                out.extend(&chars[start..i]);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Renders one `.srt` entry for a `TextUnit` (the latest version of a
/// chunk). `-->`-collapsing and optional line-breaking mirror the original
/// subtitle cleanup pass.
pub fn render_unit(unit: &TextUnit, line_length: usize) -> String {
    let mut text = collapse_arrows(&unit.text);
    if line_length > 0 && text.chars().count() > line_length {
        text = break_line(&text, line_length);
    }

    format!(
        "{}\n{} --> {}\n{}\n\n",
        unit.chunk_id,
        format_timestamp(unit.timespan.start, true, ","),
        format_timestamp(unit.timespan.end, true, ","),
        text,
    )
}

/// Concatenates `render_unit` for every chunk's latest version, in chunk-id
/// order.
pub fn write_srt<'a>(units: impl Iterator<Item = &'a TextUnit>, line_length: usize) -> String {
    units.map(|u| render_unit(u, line_length)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timespan;

    #[test]
    fn format_timestamp_rounds_and_pads() {
        assert_eq!(format_timestamp(3.0, true, ","), "00:00:03,000");
        assert_eq!(format_timestamp(3661.5, true, ","), "01:01:01,500");
        assert_eq!(format_timestamp(3661.5, false, ","), "01:01:01,500");
        assert_eq!(format_timestamp(59.0, false, "."), "00:59.000");
    }

    #[test]
    fn break_line_splits_on_nearest_space() {
        assert_eq!(break_line("hello world", 9), "hello\nworld");
        assert_eq!(break_line("nosplitabletoken", 8), "nosplitabletoken");
    }

    #[test]
    fn render_unit_collapses_arrow_runs() {
        let unit = TextUnit {
            text: "left --> right and even ----> further".into(),
            chunk_id: 0,
            timespan: Timespan::new(2.0, 3.0),
            version: 0,
            rating: 0,
        };
        let srt = render_unit(&unit, 0);
        assert!(srt.contains("left -> right and even -> further"));
        assert!(srt.starts_with("0\n00:00:02,000 --> 00:00:03,000\n"));
    }
}
