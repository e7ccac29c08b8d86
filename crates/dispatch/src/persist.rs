use std::path::Path;

use serde::Serialize;
use transcript_store::{write_srt, LanguageStore, TextUnit};

/// Best-effort write-through: every function here logs and returns on
/// failure rather than propagating. In-memory state is authoritative; these
/// are a mirror, not a source of truth.
fn write_json<T: Serialize>(path: &Path, value: &T) {
    let body = match serde_json::to_vec_pretty(value) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "failed to serialize persisted record");
            return;
        }
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(error = %e, path = %parent.display(), "failed to create persistence directory");
            return;
        }
    }
    if let Err(e) = std::fs::write(path, body) {
        tracing::warn!(error = %e, path = %path.display(), "failed to write persisted record");
    }
}

pub fn write_text_unit(save_path: &Path, lang: &str, unit: &TextUnit) {
    let path = save_path
        .join("text_chunks")
        .join(lang)
        .join(format!("{}_{}.json", unit.chunk_id, unit.version));
    write_json(&path, unit);
}

pub fn write_audio_chunk(save_path: &Path, timestamp: i64, unix_time: i64, samples: &[f32]) {
    let path = save_path
        .join("audio")
        .join(format!("{timestamp}_{unix_time}.json"));
    write_json(&path, &samples);
}

/// Writes `final_transcripts/<lang>/transcript.srt` and `all_text_chunks.json`
/// for one language's store, called once per language on session end.
pub fn flush_final(save_path: &Path, lang: &str, store: &LanguageStore) {
    let dir = save_path.join("final_transcripts").join(lang);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, path = %dir.display(), "failed to create final_transcripts directory");
        return;
    }

    let latest: Vec<&TextUnit> = store
        .chunks()
        .map(|(_, chain)| chain.last().expect("chains are never empty"))
        .collect();

    let srt = write_srt(latest.iter().copied(), 0);
    if let Err(e) = std::fs::write(dir.join("transcript.srt"), srt) {
        tracing::warn!(error = %e, lang = %lang, "failed to write transcript.srt");
    }

    write_json(&dir.join("all_text_chunks.json"), &latest);
}
