//! From raw recognitions to dispatcher submissions.

use tokio::sync::mpsc;
use vocalis_action::Dispatcher;
use vocalis_core::AssistantConfig;

/// Words recognized by the engine, with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub words: Vec<String>,
    pub confidence: f64,
}

impl Utterance {
    pub fn new(words: Vec<String>, confidence: f64) -> Self {
        Self { words, confidence }
    }

    /// Split `text` on whitespace.
    pub fn from_text(text: &str, confidence: f64) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            confidence,
        }
    }
}

/// A `(verb, noun)` pair pulled out of an utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub verb: String,
    pub noun: String,
    pub confidence: f64,
}

/// Strips the assistant name and splits the rest into verb and noun.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionFilter {
    shift: usize,
}

impl RecognitionFilter {
    /// When the assistant name is enabled every phrase starts with it, so
    /// its words are skipped.
    pub fn new(assistant: &AssistantConfig) -> Self {
        let shift = assistant
            .verb_prefix()
            .map(|name| name.split_whitespace().count())
            .unwrap_or(0);
        Self { shift }
    }

    pub fn shift(&self) -> usize {
        self.shift
    }

    /// The word after the name is the verb, the remaining words the noun.
    /// Returns `None` when there are not enough words for both.
    pub fn extract<S: AsRef<str>>(&self, words: &[S], confidence: f64) -> Option<Recognition> {
        if words.len() < self.shift + 2 {
            return None;
        }
        let verb = words[self.shift].as_ref().to_string();
        let noun = words[self.shift + 1..]
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ");
        Some(Recognition {
            verb,
            noun,
            confidence,
        })
    }
}

/// Feed utterances to the dispatcher until the sender side closes.
///
/// Never blocks on a dispatch; each accepted phrase runs on its own task.
pub async fn route_utterances(
    mut utterances: mpsc::Receiver<Utterance>,
    filter: RecognitionFilter,
    dispatcher: Dispatcher,
) {
    while let Some(utterance) = utterances.recv().await {
        let Some(recognition) = filter.extract(&utterance.words, utterance.confidence) else {
            tracing::debug!(words = ?utterance.words, "Utterance too short, ignoring");
            continue;
        };
        tracing::info!(
            verb = %recognition.verb,
            noun = %recognition.noun,
            confidence = recognition.confidence,
            "Recognized"
        );
        // Rejections are logged by the dispatcher.
        let _ = dispatcher.submit_recognized(
            &recognition.verb,
            &recognition.noun,
            recognition.confidence,
        );
    }
    tracing::debug!("Recognition source closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, enabled: bool) -> AssistantConfig {
        AssistantConfig {
            name: Some(name.to_string()),
            enable_name: enabled,
            min_confidence: None,
        }
    }

    #[test]
    fn test_extract_without_name() {
        let filter = RecognitionFilter::new(&AssistantConfig::default());
        let r = filter.extract(&["turn", "on"], 0.9).unwrap();
        assert_eq!(r.verb, "turn");
        assert_eq!(r.noun, "on");
        assert_eq!(r.confidence, 0.9);
    }

    #[test]
    fn test_extract_skips_assistant_name() {
        let filter = RecognitionFilter::new(&named("computer", true));
        assert_eq!(filter.shift(), 1);
        let r = filter.extract(&["computer", "open", "browser"], 0.8).unwrap();
        assert_eq!((r.verb.as_str(), r.noun.as_str()), ("open", "browser"));
    }

    #[test]
    fn test_disabled_name_is_not_skipped() {
        let filter = RecognitionFilter::new(&named("computer", false));
        assert_eq!(filter.shift(), 0);
    }

    #[test]
    fn test_too_few_words() {
        let filter = RecognitionFilter::new(&named("computer", true));
        assert!(filter.extract(&["computer", "open"], 1.0).is_none());
        assert!(RecognitionFilter::default().extract(&["open"], 1.0).is_none());
        assert!(RecognitionFilter::default().extract::<&str>(&[], 1.0).is_none());
    }

    #[test]
    fn test_multi_word_noun_and_name() {
        let filter = RecognitionFilter::new(&named("hey computer", true));
        let r = filter
            .extract(&["hey", "computer", "play", "jazz", "radio"], 0.7)
            .unwrap();
        assert_eq!(r.verb, "play");
        assert_eq!(r.noun, "jazz radio");
    }

    #[test]
    fn test_utterance_from_text() {
        let u = Utterance::from_text("  turn   on ", 0.5);
        assert_eq!(u.words, vec!["turn", "on"]);
    }
}
