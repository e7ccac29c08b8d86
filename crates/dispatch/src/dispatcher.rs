use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;

use asr_stabilizer::{TokenizerRegistry, Word};
use transcript_store::{CorrectionRule, TextChunkView, Timespan};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::packet::{TranscribePacket, TranslatePacket};
use crate::persist;
use crate::session::{allocate_save_path, Session};

/// Fallback language for one-shot file uploads, which carry no explicit
/// source/transcript language in the upload request.
const DEFAULT_FILE_LANG: &str = "en";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("unknown language {1:?} for session {0}")]
    UnknownLanguage(String, String),
    #[error("{0}")]
    BadRequest(String),
}

/// The single logical authority over sessions and the two job queues. All
/// mutation happens through `&mut self` methods; callers serialize access
/// with one lock (see `routes::AppState`).
pub struct Dispatcher {
    sessions: HashMap<String, Session>,
    transcribe_queue: VecDeque<TranscribePacket>,
    translate_queue: VecDeque<TranslatePacket>,
    tokenizers: TokenizerRegistry,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            transcribe_queue: VecDeque::new(),
            translate_queue: VecDeque::new(),
            tokenizers: TokenizerRegistry::with_defaults(),
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    // ---- session lifecycle -------------------------------------------------

    pub fn create_session(
        &mut self,
        session_id: String,
        source_lang: String,
        transcript_lang: String,
        supported_langs: Vec<String>,
    ) -> Result<(), DispatchError> {
        if session_id.is_empty() {
            return Err(DispatchError::BadRequest("session_id must not be empty".into()));
        }
        if self.sessions.contains_key(&session_id) {
            return Err(DispatchError::BadRequest(format!(
                "session already exists: {session_id}"
            )));
        }

        let tokenizer = self
            .tokenizers
            .get(&transcript_lang)
            .map_err(|e| DispatchError::UnknownLanguage(session_id.clone(), e.0))?;

        let save_path = allocate_save_path(&self.config.recordings_dir, &session_id, &supported_langs);
        let session = Session::new(
            session_id.clone(),
            source_lang,
            transcript_lang,
            supported_langs,
            tokenizer,
            save_path,
            self.config.max_buffer_seconds,
        );
        self.sessions.insert(session_id, session);
        Ok(())
    }

    pub fn end_session(&mut self, session_id: &str) -> Result<(), DispatchError> {
        let mut session = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;

        // Flush whatever the hypothesis buffer was still holding unconfirmed
        // (never stabilized by a second overlapping round) so it isn't lost.
        let (beg, end, text) = session.processor.finish();
        if let (Some(beg), Some(end)) = (beg, end) {
            if !text.is_empty() {
                let transcript_lang = session.transcript_lang.clone();
                if let Some((chunk_id, version)) = session
                    .store_mut(&transcript_lang)
                    .and_then(|store| store.append(&text, Timespan::new(beg, end)))
                {
                    Self::persist_appended(&session, &transcript_lang, chunk_id, version);
                }
            }
        }

        for (lang, store) in session.stores.iter() {
            persist::flush_final(&session.save_path, lang, store);
        }

        self.transcribe_queue.retain(|p| p.session_id != session_id);
        self.translate_queue.retain(|p| p.session_id != session_id);
        Ok(())
    }

    pub fn active_sessions(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn switch_source_language(&mut self, session_id: &str, lang: String) -> Result<(), DispatchError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        session.source_lang = lang;
        Ok(())
    }

    pub fn switch_transcript_language(&mut self, session_id: &str, lang: String) -> Result<(), DispatchError> {
        let tokenizer = self
            .tokenizers
            .get(&lang)
            .map_err(|e| DispatchError::UnknownLanguage(session_id.to_string(), e.0))?;
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        session.transcript_lang = lang;
        session.set_tokenizer(tokenizer);
        Ok(())
    }

    // ---- audio ingest -------------------------------------------------------

    pub fn submit_audio_chunk(
        &mut self,
        session_id: &str,
        timestamp: i64,
        samples: Vec<f32>,
    ) -> Result<(), DispatchError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        session.processor.insert_audio_chunk(&samples);
        let unix_time = chrono::Utc::now().timestamp();
        persist::write_audio_chunk(&session.save_path, timestamp, unix_time, &samples);
        Ok(())
    }

    /// One-shot upload: a fresh session, a single file-flagged packet, no
    /// online stabilization. Returns the freshly minted session id.
    pub fn submit_audio_file(&mut self, samples: Vec<f32>) -> String {
        let session_id = Uuid::new_v4().simple().to_string();
        let lang = DEFAULT_FILE_LANG.to_string();
        let tokenizer = self
            .tokenizers
            .get(&lang)
            .expect("default file language is always registered");

        let save_path = allocate_save_path(&self.config.recordings_dir, &session_id, std::slice::from_ref(&lang));
        let mut session = Session::new(
            session_id.clone(),
            lang.clone(),
            lang.clone(),
            vec![lang.clone()],
            tokenizer,
            save_path,
            self.config.max_buffer_seconds,
        );

        let packet_id = session.processor.allocate_packet_id();
        session.untranscribed_ids.push(packet_id);
        self.transcribe_queue.push_back(TranscribePacket {
            session_id: session_id.clone(),
            packet_id,
            source_lang: lang.clone(),
            transcript_lang: lang,
            prompt: String::new(),
            audio: samples,
            is_file: true,
            sent_out_time: None,
            received: false,
        });

        self.sessions.insert(session_id.clone(), session);
        session_id
    }

    // ---- worker queues -------------------------------------------------------

    /// Sweeps sessions for unprocessed audio, enqueues packets for them, then
    /// returns the first due packet (if any), marking it offered.
    pub fn pull_transcribe(&mut self, now: Instant) -> Option<TranscribePacket> {
        let Dispatcher {
            sessions,
            transcribe_queue,
            ..
        } = self;

        for (session_id, session) in sessions.iter_mut() {
            if session.processor.buffer_updated() {
                let audio = session.processor.audio_snapshot();
                let (prompt, _context) = session.processor.prompt();
                let packet_id = session.processor.allocate_packet_id();
                session.untranscribed_ids.push(packet_id);
                transcribe_queue.push_back(TranscribePacket {
                    session_id: session_id.clone(),
                    packet_id,
                    source_lang: session.source_lang.clone(),
                    transcript_lang: session.transcript_lang.clone(),
                    prompt,
                    audio,
                    is_file: false,
                    sent_out_time: None,
                    received: false,
                });
            }
        }

        let timeout = self.config.worker_timeout;
        self.transcribe_queue
            .iter_mut()
            .find(|p| p.is_due(now, timeout))
            .map(|p| {
                p.sent_out_time = Some(now);
                p.clone()
            })
    }

    pub fn pull_translate(&mut self, now: Instant) -> Option<TranslatePacket> {
        let timeout = self.config.worker_timeout;
        self.translate_queue
            .iter_mut()
            .find(|p| p.is_due(now, timeout))
            .map(|p| {
                p.sent_out_time = Some(now);
                p.clone()
            })
    }

    /// Idempotent: an unknown or already-received (session_id, packet_id)
    /// drops silently and returns `Ok(())`, matching worker re-delivery.
    pub fn post_transcribe(
        &mut self,
        session_id: &str,
        packet_id: u64,
        words: Vec<Word>,
        segment_ends: Vec<f64>,
        language: &str,
    ) -> Result<(), DispatchError> {
        let idx = self
            .transcribe_queue
            .iter()
            .position(|p| p.session_id == session_id && p.packet_id == packet_id && !p.received);
        let Some(idx) = idx else {
            return Ok(());
        };
        let mut packet = self.transcribe_queue.remove(idx).expect("index just located");
        packet.received = true;

        let Some(session) = self.sessions.get_mut(session_id) else {
            return Ok(());
        };
        session.untranscribed_ids.retain(|id| *id != packet_id);
        session.transcribed_ids.push(packet_id);

        if packet.is_file {
            for w in &words {
                if let Some((chunk_id, version)) = session
                    .store_mut(language)
                    .and_then(|store| store.append(&w.text, Timespan::new(w.start, w.end)))
                {
                    Self::persist_appended(session, language, chunk_id, version);
                }
            }
            return Ok(());
        }

        let (beg, end, text) = session.processor.process_iter(words, segment_ends);
        if let (Some(beg), Some(end)) = (beg, end) {
            if !text.is_empty() {
                let transcript_lang = session.transcript_lang.clone();
                if let Some((chunk_id, version)) = session
                    .store_mut(&transcript_lang)
                    .and_then(|store| store.append(&text, Timespan::new(beg, end)))
                {
                    Self::persist_appended(session, &transcript_lang, chunk_id, version);
                }

                let target_langs: Vec<String> = session
                    .supported_langs
                    .iter()
                    .filter(|l| **l != transcript_lang)
                    .cloned()
                    .collect();
                if !target_langs.is_empty() {
                    let packet_id = session.processor.allocate_packet_id();
                    self.translate_queue.push_back(TranslatePacket {
                        session_id: session_id.to_string(),
                        packet_id,
                        source_lang: transcript_lang,
                        target_langs,
                        source_text: text,
                        timespan: Timespan::new(beg, end),
                        sent_out_time: None,
                        received: false,
                    });
                }
            }
        }

        if let Some(session) = self.sessions.get_mut(session_id) {
            if session.processor.audio_seconds() > self.config.hard_reset_seconds {
                session.reset_processor();
            }
        }

        Ok(())
    }

    pub fn post_translate(
        &mut self,
        session_id: &str,
        packet_id: u64,
        translated_text: HashMap<String, String>,
        timespan: Timespan,
    ) -> Result<(), DispatchError> {
        let idx = self
            .translate_queue
            .iter()
            .position(|p| p.session_id == session_id && p.packet_id == packet_id && !p.received);
        let Some(idx) = idx else {
            return Ok(());
        };
        self.translate_queue.remove(idx);

        let Some(session) = self.sessions.get_mut(session_id) else {
            return Ok(());
        };
        let transcript_lang = session.transcript_lang.clone();

        for (lang, text) in translated_text {
            if lang == transcript_lang {
                continue;
            }
            if let Some((chunk_id, version)) = session
                .store_mut(&lang)
                .and_then(|store| store.append(&text, timespan))
            {
                Self::persist_appended(session, &lang, chunk_id, version);
            }
        }
        Ok(())
    }

    fn persist_appended(session: &Session, lang: &str, chunk_id: u32, version: u32) {
        if let Some(store) = session.store(lang) {
            if let Some(unit) = store
                .chunks()
                .find(|(id, _)| **id == chunk_id)
                .and_then(|(_, chain)| chain.get(version as usize))
            {
                persist::write_text_unit(&session.save_path, lang, unit);
            }
        }
    }

    // ---- read / edit API -----------------------------------------------------

    pub fn get_latest_text_chunks(
        &self,
        session_id: &str,
        lang: &str,
        known: &BTreeMap<u32, u32>,
    ) -> Result<Vec<TextChunkView>, DispatchError> {
        let store = self.store(session_id, lang)?;
        Ok(store.latest_text_chunks(known))
    }

    pub fn get_latest_text_chunk_versions(
        &self,
        session_id: &str,
        lang: &str,
    ) -> Result<BTreeMap<u32, u32>, DispatchError> {
        let store = self.store(session_id, lang)?;
        Ok(store.latest_versions())
    }

    pub fn edit_asr_chunk(
        &mut self,
        session_id: &str,
        lang: &str,
        chunk_id: u32,
        version: u32,
        text: &str,
    ) -> Result<(String, u32), DispatchError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        let save_path = session.save_path.clone();
        let store = session
            .store_mut(lang)
            .ok_or_else(|| DispatchError::UnknownLanguage(session_id.to_string(), lang.to_string()))?;

        let (new_text, new_version) = store
            .edit(chunk_id, version, text)
            .map_err(|e| DispatchError::BadRequest(e.to_string()))?;

        if let Some(unit) = store
            .chunks()
            .find(|(id, _)| **id == chunk_id)
            .and_then(|(_, chain)| chain.get(new_version as usize))
        {
            persist::write_text_unit(&save_path, lang, unit);
        }
        Ok((new_text, new_version))
    }

    pub fn rate_text_chunk(
        &mut self,
        session_id: &str,
        lang: &str,
        chunk_id: u32,
        version: u32,
        delta: i64,
    ) -> Result<(), DispatchError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        let store = session
            .store_mut(lang)
            .ok_or_else(|| DispatchError::UnknownLanguage(session_id.to_string(), lang.to_string()))?;
        store
            .rate(chunk_id, version, delta)
            .map_err(|e| DispatchError::BadRequest(e.to_string()))
    }

    pub fn submit_correction_rules(
        &mut self,
        session_id: &str,
        lang: &str,
        rules: Vec<CorrectionRule>,
    ) -> Result<(), DispatchError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        let store = session
            .store_mut(lang)
            .ok_or_else(|| DispatchError::UnknownLanguage(session_id.to_string(), lang.to_string()))?;
        store.set_correction_rules(rules);
        Ok(())
    }

    pub fn get_correction_rules(&self, session_id: &str, lang: &str) -> Result<Vec<CorrectionRule>, DispatchError> {
        Ok(self.store(session_id, lang)?.correction_rules().to_vec())
    }

    fn store(&self, session_id: &str, lang: &str) -> Result<&transcript_store::LanguageStore, DispatchError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        session
            .store(lang)
            .ok_or_else(|| DispatchError::UnknownLanguage(session_id.to_string(), lang.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn dispatcher() -> Dispatcher {
        let tmp = tempfile::tempdir().expect("tempdir");
        Dispatcher::new(DispatchConfig::default().with_recordings_dir(tmp.into_path()))
    }

    #[test]
    fn create_then_end_session_purges_queues() {
        let mut d = dispatcher();
        d.create_session("a".into(), "en".into(), "en".into(), vec!["en".into()]).unwrap();
        assert_eq!(d.active_sessions(), vec!["a".to_string()]);

        d.submit_audio_chunk("a", 0, vec![0.0; 16_000]).unwrap();
        let now = Instant::now();
        let packet = d.pull_transcribe(now).expect("sweep should enqueue a packet");
        assert_eq!(packet.session_id, "a");

        d.end_session("a").unwrap();
        assert!(d.active_sessions().is_empty());
        assert!(d.pull_transcribe(now).is_none());
    }

    #[test]
    fn unknown_session_is_an_error_on_create_path_operations() {
        let d = dispatcher();
        assert!(matches!(
            d.get_correction_rules("missing", "en"),
            Err(DispatchError::UnknownSession(_))
        ));
    }

    #[test]
    fn worker_timeout_redelivers_packet() {
        let mut d = dispatcher();
        d.create_session("a".into(), "en".into(), "en".into(), vec!["en".into()]).unwrap();
        d.submit_audio_chunk("a", 0, vec![0.0; 1_600]).unwrap();

        let t0 = Instant::now();
        let first = d.pull_transcribe(t0).expect("packet should be due immediately");
        assert_eq!(first.packet_id, 0);

        assert!(d.pull_transcribe(t0 + Duration::from_secs(5)).is_none());

        let redelivered = d
            .pull_transcribe(t0 + d.config().worker_timeout + Duration::from_secs(1))
            .expect("packet becomes due again after the worker timeout");
        assert_eq!(redelivered.packet_id, 0);
    }

    #[test]
    fn post_transcribe_is_idempotent() {
        let mut d = dispatcher();
        d.create_session("a".into(), "en".into(), "en".into(), vec!["en".into()]).unwrap();
        d.submit_audio_chunk("a", 0, vec![0.0; 1_600]).unwrap();
        let now = Instant::now();
        let packet = d.pull_transcribe(now).unwrap();

        d.post_transcribe(&packet.session_id, packet.packet_id, vec![], vec![], "en").unwrap();
        d.post_transcribe(&packet.session_id, packet.packet_id, vec![], vec![], "en").unwrap();
    }

    #[test]
    fn end_session_flushes_unconfirmed_hypothesis_text() {
        let mut d = dispatcher();
        let recordings_dir = d.config().recordings_dir.clone();
        d.create_session("a".into(), "en".into(), "en".into(), vec!["en".into()]).unwrap();
        d.submit_audio_chunk("a", 0, vec![0.0; 1_600]).unwrap();
        let now = Instant::now();
        let packet = d.pull_transcribe(now).unwrap();

        // A single round never gets a chance to confirm anything against a
        // later overlapping round, so this text sits in the hypothesis
        // buffer's unconfirmed tail, not the committed one.
        d.post_transcribe(
            &packet.session_id,
            packet.packet_id,
            vec![Word::new(0.0, 0.5, "hello"), Word::new(0.5, 1.0, "world")],
            vec![],
            "en",
        )
        .unwrap();
        let known = BTreeMap::new();
        assert!(d.get_latest_text_chunks("a", "en", &known).unwrap().is_empty());

        d.end_session("a").unwrap();

        let flushed = std::fs::read_to_string(
            recordings_dir.join("a").join("0").join("final_transcripts").join("en").join("all_text_chunks.json"),
        )
        .expect("end_session should flush the unconfirmed tail to the final transcript");
        assert!(flushed.contains("hello world"));
    }
}
