use std::sync::Arc;

use crate::hypothesis::HypothesisBuffer;
use crate::tokenizer::SentenceSplitter;
use crate::word::Word;

pub const SAMPLING_RATE: u32 = 16_000;
pub const MAX_BUFFER_SECONDS: f64 = 30.0;
pub const HARD_RESET_SECONDS: f64 = 45.0;
const PROMPT_CHAR_CAP: usize = 200;

/// Owns the audio buffer for one session, drives the `HypothesisBuffer`,
/// and trims the buffer at completed sentence/segment boundaries. Resetting
/// on unbounded growth (see `audio_seconds` / `HARD_RESET_SECONDS`) is the
/// dispatcher's call, not this type's — it only exposes the measurement.
pub struct OnlineASRProcessor {
    tokenizer: Arc<dyn SentenceSplitter>,
    separator: &'static str,
    audio_buffer: Vec<f32>,
    buffer_time_offset: f64,
    transcript_buffer: HypothesisBuffer,
    committed: Vec<Word>,
    last_chunked_at: f64,
    buffer_updated: bool,
    next_packet_id: u64,
    max_buffer_seconds: f64,
}

impl OnlineASRProcessor {
    pub fn new(tokenizer: Arc<dyn SentenceSplitter>) -> Self {
        Self::with_max_buffer_seconds(tokenizer, MAX_BUFFER_SECONDS)
    }

    /// Same as [`Self::new`] but with a caller-supplied trim trigger instead
    /// of the `MAX_BUFFER_SECONDS` default (wired from `DispatchConfig` so
    /// the trim threshold is configurable per deployment).
    pub fn with_max_buffer_seconds(tokenizer: Arc<dyn SentenceSplitter>, max_buffer_seconds: f64) -> Self {
        Self {
            tokenizer,
            separator: "",
            audio_buffer: Vec::new(),
            buffer_time_offset: 0.0,
            transcript_buffer: HypothesisBuffer::new(),
            committed: Vec::new(),
            last_chunked_at: 0.0,
            buffer_updated: false,
            next_packet_id: 0,
            max_buffer_seconds,
        }
    }

    pub fn tokenizer(&self) -> &Arc<dyn SentenceSplitter> {
        &self.tokenizer
    }

    pub fn audio_seconds(&self) -> f64 {
        self.audio_buffer.len() as f64 / SAMPLING_RATE as f64
    }

    pub fn buffer_time_offset(&self) -> f64 {
        self.buffer_time_offset
    }

    pub fn buffer_updated(&self) -> bool {
        self.buffer_updated
    }

    pub fn audio_snapshot(&mut self) -> Vec<f32> {
        self.buffer_updated = false;
        self.audio_buffer.clone()
    }

    pub fn allocate_packet_id(&mut self) -> u64 {
        let id = self.next_packet_id;
        self.next_packet_id += 1;
        id
    }

    pub fn insert_audio_chunk(&mut self, samples: &[f32]) {
        self.audio_buffer.extend_from_slice(samples);
        self.buffer_updated = true;
    }

    /// A <=200-char suffix of committed text whose end-time has already
    /// scrolled out of the audio buffer, plus the in-buffer remainder for
    /// diagnostics.
    pub fn prompt(&self) -> (String, String) {
        let mut k = self.committed.len().saturating_sub(1);
        while k > 0 && self.committed[k - 1].end > self.last_chunked_at {
            k -= 1;
        }

        let scrolled_out = &self.committed[..k];
        let mut prompt_words: Vec<&str> = Vec::new();
        let mut total_len = 0usize;
        let mut idx = scrolled_out.len();
        while idx > 0 && total_len < PROMPT_CHAR_CAP {
            idx -= 1;
            let word = &scrolled_out[idx];
            total_len += word.text.len() + 1;
            prompt_words.push(word.text.as_str());
        }
        prompt_words.reverse();

        let prompt = prompt_words.join(self.separator);
        let context = self.committed[k..]
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(self.separator);
        (prompt, context)
    }

    /// Runs on a worker's posted `(words, segment_ends)`. Returns the
    /// stabilized commit as `(begin, end, text)`, or `(None, None, "")`.
    pub fn process_iter(
        &mut self,
        words: Vec<Word>,
        mut segment_ends: Vec<f64>,
    ) -> (Option<f64>, Option<f64>, String) {
        self.transcript_buffer.insert(words, self.buffer_time_offset);
        let commit = self.transcript_buffer.flush();
        self.committed.extend(commit.iter().cloned());

        if !commit.is_empty() {
            self.chunk_completed_sentence();
        }

        if self.audio_seconds() > self.max_buffer_seconds {
            self.chunk_completed_segment(&mut segment_ends);
        }

        self.to_flush(&commit)
    }

    fn chunk_completed_sentence(&mut self) {
        if self.committed.is_empty() {
            return;
        }
        let mut sentences = self.words_to_sentences(&self.committed);
        if sentences.len() < 2 {
            return;
        }
        while sentences.len() > 2 {
            sentences.remove(0);
        }
        let chunk_at = sentences[sentences.len() - 2].end;
        self.chunk_at(chunk_at);
    }

    /// `segment_ends` is trimmed destructively from the end while the
    /// candidate boundary is still ahead of the last commit; this mirrors
    /// the original behavior verbatim.
    fn chunk_completed_segment(&mut self, segment_ends: &mut Vec<f64>) {
        if self.committed.is_empty() {
            return;
        }
        let t = self.committed.last().unwrap().end;

        if segment_ends.len() > 1 {
            let mut e = segment_ends[segment_ends.len() - 2] + self.buffer_time_offset;
            while segment_ends.len() > 2 && e > t {
                segment_ends.pop();
                e = segment_ends[segment_ends.len() - 2] + self.buffer_time_offset;
            }
            if e <= t {
                self.chunk_at(e);
            }
        }
    }

    fn chunk_at(&mut self, time: f64) {
        self.transcript_buffer.pop_committed(time);
        let cut_seconds = time - self.buffer_time_offset;
        let cut_samples = ((cut_seconds as i64).max(0) as u64 * SAMPLING_RATE as u64) as usize;
        if cut_samples >= self.audio_buffer.len() {
            self.audio_buffer.clear();
        } else {
            self.audio_buffer.drain(..cut_samples);
        }
        self.buffer_time_offset = time;
        self.last_chunked_at = time;
    }

    /// Greedy word-consume sentence reconstruction: the tokenizer segments
    /// the joined committed text, then each sentence consumes words off the
    /// front until one completes it.
    fn words_to_sentences(&self, words: &[Word]) -> Vec<Word> {
        let mut cwords: std::collections::VecDeque<Word> = words.iter().cloned().collect();
        let joined = cwords
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let mut sentences: std::collections::VecDeque<String> =
            self.tokenizer.split(&joined).into_iter().collect();

        let mut out = Vec::new();
        while let Some(raw) = sentences.pop_front() {
            let mut sent = raw.trim().to_string();
            let final_sentence = sent.clone();
            let mut beg: Option<f64> = None;
            let mut end: Option<f64> = None;

            while let Some(w) = cwords.pop_front() {
                if beg.is_none() && sent.starts_with(w.text.as_str()) {
                    beg = Some(w.start);
                } else if end.is_none() && sent == w.text {
                    end = Some(w.end);
                    out.push(Word::new(beg.unwrap_or(w.start), w.end, final_sentence.clone()));
                    break;
                }
                sent = sent.get(w.text.len()..).unwrap_or("").trim().to_string();
            }
        }
        out
    }

    fn to_flush(&self, sents: &[Word]) -> (Option<f64>, Option<f64>, String) {
        let text = sents
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(self.separator);
        if sents.is_empty() {
            (None, None, String::new())
        } else {
            (Some(sents[0].start), Some(sents[sents.len() - 1].end), text)
        }
    }

    /// Flushes whatever the hypothesis buffer still holds when a session
    /// winds down, in the same shape as `process_iter`'s return value.
    pub fn finish(&self) -> (Option<f64>, Option<f64>, String) {
        self.to_flush(self.transcript_buffer.complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::PunctuationSplitter;

    fn processor() -> OnlineASRProcessor {
        OnlineASRProcessor::new(Arc::new(PunctuationSplitter))
    }

    #[test]
    fn process_iter_commits_on_second_round() {
        let mut p = processor();
        let (b, e, t) = p.process_iter(
            vec![Word::new(0.0, 1.0, "hello"), Word::new(1.0, 2.0, "world")],
            vec![],
        );
        assert_eq!((b, e, t.as_str()), (None, None, ""));

        let (b, e, t) = p.process_iter(
            vec![Word::new(1.0, 2.0, "world"), Word::new(2.0, 3.0, "there")],
            vec![],
        );
        assert_eq!((b, e, t.as_str()), (Some(1.0), Some(2.0), "world"));
    }

    #[test]
    fn insert_audio_chunk_sets_buffer_updated() {
        let mut p = processor();
        assert!(!p.buffer_updated());
        p.insert_audio_chunk(&[0.0; 100]);
        assert!(p.buffer_updated());
        assert_eq!(p.audio_snapshot().len(), 100);
        assert!(!p.buffer_updated());
    }

    #[test]
    fn allocate_packet_id_is_monotonic() {
        let mut p = processor();
        assert_eq!(p.allocate_packet_id(), 0);
        assert_eq!(p.allocate_packet_id(), 1);
        assert_eq!(p.allocate_packet_id(), 2);
    }

    #[test]
    fn audio_seconds_tracks_buffer_length() {
        let mut p = processor();
        p.insert_audio_chunk(&vec![0.0; SAMPLING_RATE as usize * 2]);
        assert!((p.audio_seconds() - 2.0).abs() < 1e-9);
    }
}
