//! Flat phrase-to-binding lookup derived from a [`Grammar`].

use std::collections::HashMap;
use std::sync::Arc;

use vocalis_core::{ActionBinding, Grammar};

/// Normalized `"verb noun"` key: both halves trimmed and lowercased.
pub fn phrase_key(verb: &str, noun: &str) -> String {
    format!(
        "{} {}",
        verb.trim().to_lowercase(),
        noun.trim().to_lowercase()
    )
}

/// Read-only index from [`phrase_key`] to the binding it resolves to.
///
/// Shares the grammar's `Arc<ActionBinding>`s, so a lookup returns the exact
/// binding parsed for that pair. Rebuild it whenever the grammar changes.
#[derive(Debug, Clone, Default)]
pub struct PhraseIndex {
    entries: HashMap<String, Arc<ActionBinding>>,
}

impl PhraseIndex {
    /// Build the index. Pairs that collide after normalization keep the
    /// binding that appears last in the grammar.
    pub fn build(grammar: &Grammar) -> Self {
        let mut entries = HashMap::with_capacity(grammar.binding_count());
        for (verb, noun, binding) in grammar.bindings() {
            if let Some(previous) = entries.insert(phrase_key(verb, noun), Arc::clone(binding)) {
                tracing::debug!(
                    verb = %verb,
                    noun = %noun,
                    replaced = %previous.action,
                    "Phrase collides after normalization"
                );
            }
        }
        Self { entries }
    }

    pub fn lookup(&self, verb: &str, noun: &str) -> Option<&Arc<ActionBinding>> {
        self.entries.get(&phrase_key(verb, noun))
    }

    /// Look up an already-normalized key.
    pub fn lookup_phrase(&self, phrase: &str) -> Option<&Arc<ActionBinding>> {
        self.entries.get(phrase)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every indexed phrase, sorted.
    pub fn phrases(&self) -> Vec<&str> {
        let mut phrases: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        phrases.sort_unstable();
        phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> Grammar {
        let mut g = Grammar::new();
        g.bind("Turn", "On", ActionBinding::new("lights"));
        g.bind("turn", "off", ActionBinding::new("lights"));
        g.bind("open", "browser", ActionBinding::new("url"));
        g.add_verb("idle");
        g
    }

    #[test]
    fn test_phrase_key_normalization() {
        assert_eq!(phrase_key("Turn", " ON "), "turn on");
        assert_eq!(phrase_key("  open", "Browser\t"), "open browser");
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let index = PhraseIndex::build(&grammar());
        let a = index.lookup("Turn", " ON ").unwrap();
        let b = index.lookup("turn", "on").unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.action, "lights");
    }

    #[test]
    fn test_lookup_returns_grammar_binding() {
        let g = grammar();
        let index = PhraseIndex::build(&g);
        for (verb, noun, binding) in g.bindings() {
            assert!(Arc::ptr_eq(index.lookup(verb, noun).unwrap(), binding));
        }
        assert_eq!(index.len(), g.binding_count());
    }

    #[test]
    fn test_lookup_miss() {
        let index = PhraseIndex::build(&grammar());
        assert!(index.lookup("turn", "sideways").is_none());
        assert!(index.lookup("idle", "anything").is_none());
        assert!(index.lookup_phrase("Turn On").is_none());
        assert!(index.lookup_phrase("turn on").is_some());
    }

    #[test]
    fn test_collision_keeps_last() {
        let mut g = Grammar::new();
        g.bind("go", "Home", ActionBinding::new("first"));
        g.bind("go", "home", ActionBinding::new("second"));
        let index = PhraseIndex::build(&g);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("go", "home").unwrap().action, "second");
    }

    #[test]
    fn test_empty_grammar() {
        let index = PhraseIndex::build(&Grammar::new());
        assert!(index.is_empty());
        assert!(index.phrases().is_empty());
    }

    #[test]
    fn test_phrases_sorted() {
        let index = PhraseIndex::build(&grammar());
        assert_eq!(index.phrases(), vec!["open browser", "turn off", "turn on"]);
    }
}
