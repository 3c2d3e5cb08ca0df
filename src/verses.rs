use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::bible::BibleClient;
use crate::emotions::EmotionEntry;

/// Fixed passage used whenever the upstream API cannot provide one.
/// Deliberately not randomized so degraded responses are observable.
pub const FALLBACK_REFERENCE: &str = "John 16:33";
pub const FALLBACK_TEXT: &str =
    "In this world you will have trouble. But take heart! I have overcome the world.";
pub const FALLBACK_EXPLANATION: &str = "This verse reminds us that life can be hard, \
     but Jesus has already overcome the world. We can find hope and peace in Him.";

#[async_trait]
pub trait PassageFetcher: Send + Sync {
    async fn fetch(&self, reference: &str) -> Option<String>;
}

#[async_trait]
impl PassageFetcher for BibleClient {
    async fn fetch(&self, reference: &str) -> Option<String> {
        BibleClient::fetch(self, reference).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    pub reference: String,
    pub text: String,
    pub explanation: String,
}

pub struct VerseSelector {
    fetcher: Arc<dyn PassageFetcher>,
}

impl VerseSelector {
    pub fn new(fetcher: Arc<dyn PassageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Pick one candidate reference at random and fetch its text. When the
    /// fetch comes back empty we do not try another reference; the fixed
    /// fallback passage stands in for every emotion.
    pub async fn select(&self, entry: &EmotionEntry, explanation: String) -> Verse {
        let reference = {
            let mut rng = rand::thread_rng();
            entry
                .references
                .choose(&mut rng)
                .copied()
                .unwrap_or(FALLBACK_REFERENCE)
        };

        match self.fetcher.fetch(reference).await {
            Some(text) => Verse {
                reference: reference.to_string(),
                text,
                explanation,
            },
            None => Verse {
                reference: FALLBACK_REFERENCE.to_string(),
                text: FALLBACK_TEXT.to_string(),
                explanation: FALLBACK_EXPLANATION.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotions::EmotionCatalog;

    struct Unavailable;

    #[async_trait]
    impl PassageFetcher for Unavailable {
        async fn fetch(&self, _reference: &str) -> Option<String> {
            None
        }
    }

    struct Canned;

    #[async_trait]
    impl PassageFetcher for Canned {
        async fn fetch(&self, reference: &str) -> Option<String> {
            Some(format!("text of {}", reference))
        }
    }

    #[tokio::test]
    async fn fallback_is_stable_when_fetch_fails() {
        let catalog = EmotionCatalog::new();
        let entry = catalog.lookup("sad").unwrap();
        let selector = VerseSelector::new(Arc::new(Unavailable));

        let first = selector.select(entry, catalog.explanation_for("sad")).await;
        for _ in 0..10 {
            let again = selector.select(entry, catalog.explanation_for("sad")).await;
            assert_eq!(again, first);
        }
        assert_eq!(first.reference, FALLBACK_REFERENCE);
        assert_eq!(first.text, FALLBACK_TEXT);
        assert_eq!(first.explanation, FALLBACK_EXPLANATION);
    }

    #[tokio::test]
    async fn successful_fetch_composes_reference_text_and_explanation() {
        let catalog = EmotionCatalog::new();
        let entry = catalog.lookup("anxious").unwrap();
        let selector = VerseSelector::new(Arc::new(Canned));

        let verse = selector
            .select(entry, catalog.explanation_for("anxious"))
            .await;

        assert!(entry.references.contains(&verse.reference.as_str()));
        assert_eq!(verse.text, format!("text of {}", verse.reference));
        assert!(verse.explanation.contains("anxious"));
    }
}
