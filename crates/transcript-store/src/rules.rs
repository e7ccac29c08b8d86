use crate::types::CorrectionRule;

fn longest_active_source_len(rules: &[CorrectionRule]) -> usize {
    rules
        .iter()
        .flat_map(|r| r.sources.iter())
        .filter(|s| s.active && !s.text.is_empty())
        .map(|s| s.text.chars().count())
        .max()
        .unwrap_or(0)
}

/// Streaming left-to-right rewrite: one pass over `input`, a rolling buffer,
/// rules tried in order, sources within a rule tried in order. A match is
/// always a suffix of the buffer, since the buffer is scanned for a match
/// after every character it grows by.
pub fn rewrite(rules: &[CorrectionRule], input: &str) -> String {
    let longest = longest_active_source_len(rules);
    let mut buffer = String::new();
    let mut out = String::new();

    for ch in input.chars() {
        buffer.push(ch);
        let mut fired = false;

        'rules: for rule in rules {
            for source in &rule.sources {
                if source.active && !source.text.is_empty() && buffer.ends_with(source.text.as_str())
                {
                    let head_len = buffer.len() - source.text.len();
                    out.push_str(&buffer[..head_len]);
                    out.push_str(&rule.replacement);
                    buffer.clear();
                    fired = true;
                    break 'rules;
                }
            }
        }

        if !fired {
            let total_chars = buffer.chars().count();
            if total_chars > longest {
                let keep = longest.saturating_sub(1);
                let drop = total_chars.saturating_sub(keep);
                let split_at = buffer
                    .char_indices()
                    .nth(drop)
                    .map(|(i, _)| i)
                    .unwrap_or(buffer.len());
                out.push_str(&buffer[..split_at]);
                buffer.drain(..split_at);
            }
        }
    }

    out.push_str(&buffer);
    out
}

/// Incremental counterpart of [`rewrite`] for callers that feed characters
/// one at a time instead of a complete string (e.g. a live editing widget).
/// Holds the same rolling buffer; `push` returns the text, if any, that has
/// become final and can be appended to a display.
pub struct Rewriter<'a> {
    rules: &'a [CorrectionRule],
    longest: usize,
    buffer: String,
}

impl<'a> Rewriter<'a> {
    pub fn new(rules: &'a [CorrectionRule]) -> Self {
        Self {
            rules,
            longest: longest_active_source_len(rules),
            buffer: String::new(),
        }
    }

    pub fn push(&mut self, ch: char) -> String {
        self.buffer.push(ch);
        let mut out = String::new();

        'rules: for rule in self.rules {
            for source in &rule.sources {
                if source.active
                    && !source.text.is_empty()
                    && self.buffer.ends_with(source.text.as_str())
                {
                    let head_len = self.buffer.len() - source.text.len();
                    out.push_str(&self.buffer[..head_len]);
                    out.push_str(&rule.replacement);
                    self.buffer.clear();
                    return out;
                }
            }
        }
        let total_chars = self.buffer.chars().count();
        if total_chars > self.longest {
            let keep = self.longest.saturating_sub(1);
            let drop = total_chars.saturating_sub(keep);
            let split_at = self
                .buffer
                .char_indices()
                .nth(drop)
                .map(|(i, _)| i)
                .unwrap_or(self.buffer.len());
            out.push_str(&self.buffer[..split_at]);
            self.buffer.drain(..split_at);
        }
        out
    }

    /// Flushes whatever remains in the rolling buffer, unmatched.
    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceString;

    fn rule(sources: &[(&str, bool)], to: &str) -> CorrectionRule {
        CorrectionRule {
            sources: sources
                .iter()
                .map(|(s, active)| SourceString {
                    text: s.to_string(),
                    active: *active,
                })
                .collect(),
            replacement: to.to_string(),
        }
    }

    #[test]
    fn empty_rule_set_is_identity() {
        assert_eq!(rewrite(&[], "teh quick fox"), "teh quick fox");
    }

    #[test]
    fn basic_substitution() {
        let rules = vec![rule(&[("teh", true), ("te", false)], "the")];
        assert_eq!(rewrite(&rules, "teh quick"), "the quick");
    }

    #[test]
    fn inactive_source_is_ignored() {
        let rules = vec![rule(&[("teh", true), ("te", false)], "the")];
        assert_eq!(rewrite(&rules, "te quick"), "te quick");
    }

    #[test]
    fn earlier_rule_wins_over_later() {
        let rules = vec![rule(&[("ab", true)], "X"), rule(&[("b", true)], "Y")];
        assert_eq!(rewrite(&rules, "ab"), "X");
    }

    #[test]
    fn earlier_source_wins_within_a_rule() {
        let rules = vec![rule(&[("ab", true), ("b", true)], "X")];
        assert_eq!(rewrite(&rules, "ab"), "X");
    }

    #[test]
    fn idempotent_on_already_clean_text() {
        let rules = vec![rule(&[("teh", true)], "the")];
        let once = rewrite(&rules, "the quick");
        let twice = rewrite(&rules, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn buffer_trims_past_longest_source_without_match() {
        let rules = vec![rule(&[("xyz", true)], "_")];
        assert_eq!(rewrite(&rules, "abcdefgh"), "abcdefgh");
    }

    #[test]
    fn incremental_rewriter_matches_free_function() {
        let rules = vec![rule(&[("teh", true)], "the")];
        let mut r = Rewriter::new(&rules);
        let mut out = String::new();
        for ch in "teh quick".chars() {
            out.push_str(&r.push(ch));
        }
        out.push_str(&r.finish());
        assert_eq!(out, rewrite(&rules, "teh quick"));
    }
}
