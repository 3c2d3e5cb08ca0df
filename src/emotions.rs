//! Closed vocabulary of emotion keywords and their candidate passages.

pub struct EmotionEntry {
    pub keyword: &'static str,
    pub references: &'static [&'static str],
}

/// Definition order is the tie-break: when a message mentions more than one
/// keyword, the first entry in this table wins.
pub const EMOTIONS: &[EmotionEntry] = &[
    EmotionEntry {
        keyword: "sad",
        references: &["Psalm 34:18", "Matthew 11:28"],
    },
    EmotionEntry {
        keyword: "anxious",
        references: &["Philippians 4:6-7", "1 Peter 5:7"],
    },
    EmotionEntry {
        keyword: "lonely",
        references: &["Hebrews 13:5", "Psalm 68:6"],
    },
    EmotionEntry {
        keyword: "angry",
        references: &["Ephesians 4:26", "Proverbs 15:1"],
    },
    EmotionEntry {
        keyword: "scared",
        references: &["2 Timothy 1:7", "Isaiah 41:10"],
    },
    EmotionEntry {
        keyword: "depressed",
        references: &["Psalm 40:1-3", "Matthew 11:28-30"],
    },
    EmotionEntry {
        keyword: "stressed",
        references: &["Matthew 6:34", "Philippians 4:6-7"],
    },
    EmotionEntry {
        keyword: "hopeless",
        references: &["Romans 15:13", "Jeremiah 29:11"],
    },
];

pub struct EmotionCatalog {
    entries: &'static [EmotionEntry],
}

impl EmotionCatalog {
    pub fn new() -> Self {
        Self { entries: EMOTIONS }
    }

    /// Substring match against the lowercased, trimmed input; first entry in
    /// definition order wins.
    pub fn lookup(&self, text: &str) -> Option<&'static EmotionEntry> {
        let normalized = text.trim().to_lowercase();
        self.entries
            .iter()
            .find(|entry| normalized.contains(entry.keyword))
    }

    /// Comma-separated keyword list for prompts and reply keyboards.
    pub fn keyword_line(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("'{}'", e.keyword))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn keywords(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.keyword).collect()
    }

    pub fn explanation_for(&self, keyword: &str) -> String {
        format!(
            "This verse reminds us that feeling {} is a natural part of life, \
             but God is always with us to provide comfort and guidance.",
            keyword
        )
    }
}

impl Default for EmotionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_matches_case_insensitively() {
        let catalog = EmotionCatalog::new();
        for entry in EMOTIONS {
            let text = format!("I am feeling so {} today", entry.keyword.to_uppercase());
            let matched = catalog.lookup(&text).unwrap();
            assert_eq!(matched.keyword, entry.keyword);
        }
    }

    #[test]
    fn unmatched_text_returns_none() {
        let catalog = EmotionCatalog::new();
        assert!(catalog.lookup("purple elephants").is_none());
        assert!(catalog.lookup("").is_none());
    }

    #[test]
    fn first_definition_wins_on_multiple_keywords() {
        let catalog = EmotionCatalog::new();
        // "sad" precedes "anxious" in the table
        let matched = catalog.lookup("anxious and a bit sad").unwrap();
        assert_eq!(matched.keyword, "sad");
    }

    #[test]
    fn every_entry_has_references() {
        for entry in EMOTIONS {
            assert!(!entry.references.is_empty(), "{} has no references", entry.keyword);
        }
    }
}
