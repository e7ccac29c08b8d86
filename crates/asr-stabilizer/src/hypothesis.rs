use crate::word::Word;

const DROP_STALE_SLACK_SECONDS: f64 = 0.1;
const OVERLAP_SEAM_SECONDS: f64 = 1.0;
const MAX_OVERLAP_NGRAM: usize = 5;

/// Stabilizes a stream of overlapping re-transcriptions of a moving audio
/// window into a committed, monotone-in-end-time word sequence. A word is
/// committed only once it has appeared in two consecutive rounds at the
/// same position (`flush`'s longest-common-prefix check); the 5-gram
/// overlap check in `insert` absorbs the seam between the already-committed
/// prefix and the new hypothesis.
#[derive(Debug, Default)]
pub struct HypothesisBuffer {
    committed_in_buffer: Vec<Word>,
    buffer: Vec<Word>,
    new: Vec<Word>,
    last_committed_time: f64,
}

impl HypothesisBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_committed_time(&self) -> f64 {
        self.last_committed_time
    }

    /// Shifts `words` by `offset`, drops anything that ended before the
    /// last commit (with a small slack), then collapses a matching n-gram
    /// (1..=5 words) at the seam between the previously committed tail and
    /// this round's new words.
    pub fn insert(&mut self, words: Vec<Word>, offset: f64) {
        let shifted: Vec<Word> = words
            .into_iter()
            .map(|w| Word::new(w.start + offset, w.end + offset, w.text))
            .collect();

        self.new = shifted
            .into_iter()
            .filter(|w| w.start > self.last_committed_time - DROP_STALE_SLACK_SECONDS)
            .collect();

        if self.new.is_empty() {
            return;
        }

        let first_start = self.new[0].start;
        if (first_start - self.last_committed_time).abs() < OVERLAP_SEAM_SECONDS
            && !self.committed_in_buffer.is_empty()
        {
            let cn = self.committed_in_buffer.len();
            let nn = self.new.len();
            let max_n = cn.min(nn).min(MAX_OVERLAP_NGRAM);

            for i in 1..=max_n {
                let committed_tail: Vec<&str> = self.committed_in_buffer[cn - i..]
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect();
                let new_head: Vec<&str> =
                    self.new[..i].iter().map(|w| w.text.as_str()).collect();

                if committed_tail == new_head {
                    self.new.drain(..i);
                    break;
                }
            }
        }
    }

    /// Longest common prefix of `new` and the previous round's `buffer`,
    /// compared word text. Commits and drops matching entries from the
    /// front of both, then the unconsumed `new` becomes `buffer` for the
    /// next round.
    pub fn flush(&mut self) -> Vec<Word> {
        let mut commit = Vec::new();

        while let (Some(n), Some(b)) = (self.new.first(), self.buffer.first()) {
            if n.text == b.text {
                let n = self.new.remove(0);
                self.buffer.remove(0);
                self.last_committed_time = n.end;
                commit.push(n);
            } else {
                break;
            }
        }

        self.buffer = std::mem::take(&mut self.new);
        self.committed_in_buffer.extend(commit.iter().cloned());
        commit
    }

    /// Drops leading committed entries that end at or before `time`.
    pub fn pop_committed(&mut self, time: f64) {
        while matches!(self.committed_in_buffer.first(), Some(w) if w.end <= time) {
            self.committed_in_buffer.remove(0);
        }
    }

    /// The buffer as it stood after the last `flush`, for use when winding
    /// down a session (there is no next round to confirm it against).
    pub fn complete(&self) -> &[Word] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stabilizes_across_two_rounds() {
        let mut hb = HypothesisBuffer::new();
        hb.insert(
            vec![Word::new(0.0, 1.0, "hello"), Word::new(1.0, 2.0, "world")],
            0.0,
        );
        let commit = hb.flush();
        assert!(commit.is_empty());

        hb.insert(
            vec![Word::new(1.0, 2.0, "world"), Word::new(2.0, 3.0, "there")],
            0.0,
        );
        let commit = hb.flush();
        assert_eq!(commit, vec![Word::new(1.0, 2.0, "world")]);
        assert_eq!(hb.last_committed_time(), 2.0);
    }

    #[test]
    fn ngram_overlap_is_deduped() {
        // Drive committed_in_buffer to [(4,5,"a"),(5,6,"b")] with
        // last_committed_time == 6, matching the fixture in the spec.
        let mut hb = HypothesisBuffer::new();
        hb.insert(vec![Word::new(4.0, 5.0, "a")], 0.0);
        hb.flush();
        hb.insert(vec![Word::new(4.0, 5.0, "a"), Word::new(5.0, 6.0, "b")], 0.0);
        hb.flush();
        hb.insert(vec![Word::new(5.0, 6.0, "b"), Word::new(6.0, 7.0, "x")], 0.0);
        hb.flush();
        assert_eq!(hb.last_committed_time(), 6.0);

        hb.insert(
            vec![
                Word::new(5.8, 6.5, "a"),
                Word::new(6.5, 7.0, "b"),
                Word::new(7.0, 8.0, "c"),
            ],
            0.0,
        );
        assert_eq!(
            hb.new,
            vec![Word::new(7.0, 8.0, "c")],
            "overlap with committed tail [a, b] should be dropped"
        );
    }

    #[test]
    fn pop_committed_drops_entries_ending_before_time() {
        let mut hb = HypothesisBuffer::new();
        hb.insert(vec![Word::new(0.0, 1.0, "a"), Word::new(1.0, 2.0, "a")], 0.0);
        hb.flush();
        hb.insert(vec![Word::new(1.0, 2.0, "a"), Word::new(2.0, 3.0, "b")], 0.0);
        hb.flush();
        assert!(!hb.committed_in_buffer.is_empty());
        hb.pop_committed(2.0);
        assert!(hb.committed_in_buffer.iter().all(|w| w.end > 2.0));
    }
}
