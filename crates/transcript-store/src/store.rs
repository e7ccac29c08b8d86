use std::collections::BTreeMap;

use crate::rules::rewrite;
use crate::types::{CorrectionRule, TextChunkView, TextUnit, Timespan, VersionChain};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown chunk id {0}")]
    UnknownChunk(u32),
    #[error("unknown version {1} for chunk {0}")]
    UnknownVersion(u32, u32),
}

/// Per-language chunk store: chunkId -> version chain, plus the correction
/// rules applied to text as it is appended or edited.
#[derive(Debug, Default)]
pub struct LanguageStore {
    chunks: BTreeMap<u32, VersionChain>,
    rules: Vec<CorrectionRule>,
}

impl LanguageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_chunk_id(&self) -> u32 {
        self.chunks.keys().next_back().map(|id| id + 1).unwrap_or(0)
    }

    /// No-op (returns `None`) if the corrected text is empty.
    pub fn append(&mut self, text: &str, timespan: Timespan) -> Option<(u32, u32)> {
        let corrected = rewrite(&self.rules, text);
        if corrected.is_empty() {
            return None;
        }

        let chunk_id = self.next_chunk_id();
        let unit = TextUnit {
            text: corrected,
            chunk_id,
            timespan,
            version: 0,
            rating: 0,
        };
        self.chunks.insert(chunk_id, vec![unit]);
        Some((chunk_id, 0))
    }

    /// Idempotent on an unchanged corrected text; otherwise appends a new
    /// version at the end of the chain. The caller's `_version` is advisory
    /// and intentionally unused (last-writer-wins).
    pub fn edit(
        &mut self,
        chunk_id: u32,
        _version: u32,
        text: &str,
    ) -> Result<(String, u32), StoreError> {
        let corrected = rewrite(&self.rules, text);
        let chain = self
            .chunks
            .get_mut(&chunk_id)
            .ok_or(StoreError::UnknownChunk(chunk_id))?;
        let tail = chain.last().expect("chains are never empty");

        if corrected == tail.text {
            return Ok((tail.text.clone(), tail.version));
        }

        let new_version = chain.len() as u32;
        let unit = TextUnit {
            text: corrected,
            chunk_id,
            timespan: chain[0].timespan,
            version: new_version,
            rating: 0,
        };
        chain.push(unit);
        let tail = chain.last().expect("chain was just pushed to");
        Ok((tail.text.clone(), tail.version))
    }

    pub fn latest_versions(&self) -> BTreeMap<u32, u32> {
        self.chunks
            .iter()
            .map(|(id, chain)| (*id, chain.last().expect("chains are never empty").version))
            .collect()
    }

    pub fn latest_text_chunks(&self, known: &BTreeMap<u32, u32>) -> Vec<TextChunkView> {
        self.chunks
            .iter()
            .filter_map(|(id, chain)| {
                let tail = chain.last().expect("chains are never empty");
                let is_stale = known.get(id).map(|known_v| *known_v < tail.version).unwrap_or(true);
                is_stale.then(|| TextChunkView {
                    chunk_id: *id,
                    version: tail.version,
                    text: tail.text.clone(),
                })
            })
            .collect()
    }

    pub fn rate(&mut self, chunk_id: u32, version: u32, delta: i64) -> Result<(), StoreError> {
        let chain = self
            .chunks
            .get_mut(&chunk_id)
            .ok_or(StoreError::UnknownChunk(chunk_id))?;
        let unit = chain
            .get_mut(version as usize)
            .ok_or(StoreError::UnknownVersion(chunk_id, version))?;
        unit.rating += delta;
        Ok(())
    }

    /// Replaces the rule list atomically, dropping ineffective rules and
    /// empty source strings from the rest.
    pub fn set_correction_rules(&mut self, rules: Vec<CorrectionRule>) {
        self.rules = rules
            .into_iter()
            .map(CorrectionRule::with_empty_sources_dropped)
            .filter(CorrectionRule::is_effective)
            .collect();
    }

    pub fn correction_rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    pub fn chunks(&self) -> impl Iterator<Item = (&u32, &VersionChain)> {
        self.chunks.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceString;

    #[test]
    fn append_assigns_dense_ids() {
        let mut store = LanguageStore::new();
        let (id0, v0) = store.append("Hi", Timespan::new(0.0, 1.0)).unwrap();
        let (id1, _) = store.append("There", Timespan::new(1.0, 2.0)).unwrap();
        assert_eq!((id0, v0), (0, 0));
        assert_eq!(id1, 1);
    }

    #[test]
    fn append_of_empty_text_is_noop() {
        let mut store = LanguageStore::new();
        assert_eq!(store.append("", Timespan::new(0.0, 1.0)), None);
        assert!(store.is_empty());
    }

    #[test]
    fn edit_is_idempotent_on_unchanged_text() {
        let mut store = LanguageStore::new();
        let (id, _) = store.append("Hi", Timespan::new(0.0, 1.0)).unwrap();

        let (text, version) = store.edit(id, 0, "Hi").unwrap();
        assert_eq!((text.as_str(), version), ("Hi", 0));

        let (text, version) = store.edit(id, 0, "Hello").unwrap();
        assert_eq!((text.as_str(), version), ("Hello", 1));
    }

    #[test]
    fn rate_accepts_negative_deltas() {
        let mut store = LanguageStore::new();
        let (id, v) = store.append("Hi", Timespan::new(0.0, 1.0)).unwrap();
        store.rate(id, v, -3).unwrap();
        store.rate(id, v, 1).unwrap();
        assert_eq!(store.latest_versions().get(&id), Some(&0));
    }

    #[test]
    fn latest_text_chunks_only_returns_stale_entries() {
        let mut store = LanguageStore::new();
        let (id, _) = store.append("Hi", Timespan::new(0.0, 1.0)).unwrap();
        let known = store.latest_versions();
        assert!(store.latest_text_chunks(&known).is_empty());

        store.edit(id, 0, "Hello").unwrap();
        let stale = store.latest_text_chunks(&known);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].text, "Hello");
    }

    #[test]
    fn set_correction_rules_drops_ineffective_ones() {
        let mut store = LanguageStore::new();
        store.set_correction_rules(vec![
            CorrectionRule {
                sources: vec![SourceString { text: "".into(), active: true }],
                replacement: "x".into(),
            },
            CorrectionRule {
                sources: vec![SourceString { text: "teh".into(), active: true }],
                replacement: "".into(),
            },
            CorrectionRule {
                sources: vec![
                    SourceString { text: "".into(), active: true },
                    SourceString { text: "foo".into(), active: true },
                ],
                replacement: "bar".into(),
            },
        ]);
        assert_eq!(store.correction_rules().len(), 1);
        assert_eq!(store.correction_rules()[0].sources.len(), 1);
    }
}
