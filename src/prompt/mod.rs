//! Phrase sets: the text targets steering a run.

use crate::error::{ImaginarError, Result};

/// Delimiter splitting one argument into multiple phrases.
pub const PHRASE_DELIMITER: char = '|';

/// The encouraged and discouraged text targets of a run.
///
/// Encouraged phrases are alternatives averaged over, not concatenated;
/// every phrase pulls the latent simultaneously. Replacing the set mid-run
/// invalidates the optimizer state and the best-result tracker, which the
/// driver handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseSet {
    encourage: Vec<String>,
    discourage: Vec<String>,
}

fn split_phrases(text: &str) -> Vec<String> {
    text.split(PHRASE_DELIMITER)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl PhraseSet {
    /// Parse encourage and discourage phrase strings.
    ///
    /// Both strings may contain the `|` delimiter. An empty encourage set is
    /// a configuration error; an empty discourage set is fine.
    pub fn parse(encourage: &str, discourage: &str) -> Result<Self> {
        let encourage = split_phrases(encourage);
        if encourage.is_empty() {
            return Err(ImaginarError::EmptyPrompt);
        }
        Ok(Self { encourage, discourage: split_phrases(discourage) })
    }

    /// The encouraged phrases, in argument order.
    #[must_use]
    pub fn encourage(&self) -> &[String] {
        &self.encourage
    }

    /// The discouraged phrases, possibly empty.
    #[must_use]
    pub fn discourage(&self) -> &[String] {
        &self.discourage
    }

    /// Filesystem-safe name derived from the phrases.
    ///
    /// Spaces become underscores, commas are dropped, delimiters become
    /// `--`, and discouraged phrases are appended after `_wout_`. Capped at
    /// 255 characters.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut name = self.encourage.join("--");
        if !self.discourage.is_empty() {
            name.push_str("_wout_");
            name.push_str(&self.discourage.join("--"));
        }
        let cleaned: String = name
            .chars()
            .filter(|&c| c != ',')
            .map(|c| match c {
                ' ' => '_',
                '-' => '_',
                c if c.is_alphanumeric() || c == '_' || c == '.' => c,
                _ => '_',
            })
            .collect();
        cleaned.trim_matches(['-', '_']).chars().take(255).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_phrase() {
        let set = PhraseSet::parse("a red cube", "").unwrap();
        assert_eq!(set.encourage(), ["a red cube"]);
        assert!(set.discourage().is_empty());
    }

    #[test]
    fn test_delimiter_splits_and_trims() {
        let set = PhraseSet::parse("fire | flames|heat", "").unwrap();
        assert_eq!(set.encourage(), ["fire", "flames", "heat"]);
    }

    #[test]
    fn test_empty_encourage_rejected() {
        assert!(matches!(PhraseSet::parse("", ""), Err(ImaginarError::EmptyPrompt)));
        assert!(matches!(PhraseSet::parse("  |  ", ""), Err(ImaginarError::EmptyPrompt)));
    }

    #[test]
    fn test_discourage_parsed() {
        let set = PhraseSet::parse("a forest", "blurry|text").unwrap();
        assert_eq!(set.discourage(), ["blurry", "text"]);
    }

    #[test]
    fn test_slug_sanitizes() {
        let set = PhraseSet::parse("a red cube, shiny", "blurry").unwrap();
        let slug = set.slug();
        assert!(!slug.contains(' '));
        assert!(!slug.contains(','));
        assert!(slug.contains("wout"));
    }

    #[test]
    fn test_slug_caps_length() {
        let long = "x".repeat(600);
        let set = PhraseSet::parse(&long, "").unwrap();
        assert!(set.slug().len() <= 255);
    }
}
