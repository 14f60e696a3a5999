//! Word ↔ id mapping.
//!
//! The production vocabulary lives outside this crate; queries only need the
//! [`WordIndexer`] surface. [`StringWordIndexer`] is the in-memory version used
//! to build models from string n-grams and in tests.

use crate::types::WordId;
use rustc_hash::FxHashMap;

/// Default sentence-start symbol.
pub const START_SYMBOL: &str = "<s>";
/// Default sentence-end symbol.
pub const END_SYMBOL: &str = "</s>";
/// Default unknown-word symbol.
pub const UNK_SYMBOL: &str = "<unk>";

/// Maps external tokens to dense [`WordId`]s.
pub trait WordIndexer<W> {
    /// Returns the id of `word`, assigning the next free id if it is new.
    fn get_or_add_index(&mut self, word: &W) -> WordId;

    /// Returns the id of `word` if it is known.
    fn get_index(&self, word: &W) -> Option<WordId>;

    /// Returns the id of `word`, or the unknown symbol's id if it is not known.
    fn get_index_possibly_unk(&self, word: &W) -> WordId;

    /// Returns the token for `id`.
    fn get_word(&self, id: WordId) -> Option<&W>;

    /// Number of distinct ids assigned.
    fn num_words(&self) -> usize;

    /// Sentence-start token.
    fn start_symbol(&self) -> &W;

    /// Sentence-end token.
    fn end_symbol(&self) -> &W;

    /// Unknown-word token.
    fn unk_symbol(&self) -> &W;
}

/// Hash-map backed indexer over `String` tokens.
///
/// The start, end and unknown symbols are registered at construction. With
/// distinct symbols they get ids `0`, `1` and `2`; a repeated symbol shares
/// the id of its first registration.
#[derive(Debug, Clone)]
pub struct StringWordIndexer {
    ids: FxHashMap<String, WordId>,
    words: Vec<String>,
    start: String,
    end: String,
    unk: String,
    start_id: WordId,
    end_id: WordId,
    unk_id: WordId,
}

impl StringWordIndexer {
    /// Creates an indexer with the default `<s>`, `</s>` and `<unk>` symbols.
    #[must_use]
    pub fn new() -> Self {
        Self::with_symbols(START_SYMBOL, END_SYMBOL, UNK_SYMBOL)
    }

    /// Creates an indexer with custom special symbols.
    #[must_use]
    pub fn with_symbols(start: &str, end: &str, unk: &str) -> Self {
        let mut indexer = Self {
            ids: FxHashMap::default(),
            words: Vec::new(),
            start: start.to_string(),
            end: end.to_string(),
            unk: unk.to_string(),
            start_id: WordId(0),
            end_id: WordId(0),
            unk_id: WordId(0),
        };
        indexer.start_id = indexer.add_str(start);
        indexer.end_id = indexer.add_str(end);
        indexer.unk_id = indexer.add_str(unk);
        indexer
    }

    /// Returns the id of `word`, assigning one if needed.
    pub fn add_str(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = WordId(self.words.len() as u32);
        self.ids.insert(word.to_string(), id);
        self.words.push(word.to_string());
        id
    }

    /// Looks up `word` without allocating.
    #[must_use]
    pub fn index_of(&self, word: &str) -> Option<WordId> {
        self.ids.get(word).copied()
    }

    /// Looks up `word`, mapping unseen words to `<unk>`.
    #[must_use]
    pub fn index_of_possibly_unk(&self, word: &str) -> WordId {
        self.index_of(word).unwrap_or_else(|| self.unk_id())
    }

    /// Id of the sentence-start symbol.
    #[must_use]
    pub fn start_id(&self) -> WordId {
        self.start_id
    }

    /// Id of the sentence-end symbol.
    #[must_use]
    pub fn end_id(&self) -> WordId {
        self.end_id
    }

    /// Id of the unknown-word symbol.
    #[must_use]
    pub fn unk_id(&self) -> WordId {
        self.unk_id
    }

    /// Converts a whitespace-separated phrase to ids, assigning new ones.
    pub fn add_phrase(&mut self, phrase: &str) -> Vec<WordId> {
        phrase.split_whitespace().map(|w| self.add_str(w)).collect()
    }
}

impl Default for StringWordIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl WordIndexer<String> for StringWordIndexer {
    fn get_or_add_index(&mut self, word: &String) -> WordId {
        self.add_str(word)
    }

    fn get_index(&self, word: &String) -> Option<WordId> {
        self.index_of(word)
    }

    fn get_index_possibly_unk(&self, word: &String) -> WordId {
        self.index_of_possibly_unk(word)
    }

    fn get_word(&self, id: WordId) -> Option<&String> {
        self.words.get(id.index())
    }

    fn num_words(&self) -> usize {
        self.words.len()
    }

    fn start_symbol(&self) -> &String {
        &self.start
    }

    fn end_symbol(&self) -> &String {
        &self.end
    }

    fn unk_symbol(&self) -> &String {
        &self.unk
    }
}
