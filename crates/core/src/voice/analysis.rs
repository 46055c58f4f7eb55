//! Local lexical analysis of segment text: intensity, rhythm, mood.

use serde::{Deserialize, Serialize};

use crate::config::VoiceConfig;

const EXCLAMATION_WEIGHT: f64 = 1.0;
const QUESTION_WEIGHT: f64 = 0.5;
const ELLIPSIS_WEIGHT: f64 = 0.5;
const PUNCTUATION_SCALE: f64 = 2.0;
const CAPS_SCALE: f64 = 1.0;
const KEYWORD_SCALE: f64 = 2.0;

const PASSIONATE_INTENSITY: f64 = 0.7;
const BUILDING_INTENSITY: f64 = 0.4;
const INTIMATE_KEYWORD_DENSITY: f64 = 0.1;
const PLAYFUL_RHYTHM: f64 = 0.25;

/// Mood classification driving the prosody wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextualMood {
    Calm,
    Intimate,
    Playful,
    Building,
    Passionate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    /// 0-1, from punctuation density, capitalized runs and keyword hits
    pub intensity: f64,
    /// 0-1, mean sentence length relative to the reference length
    pub rhythm: f64,
    /// Keyword hits per word
    pub keyword_density: f64,
    pub mood: ContextualMood,
}

/// Count sentence-terminal punctuation marks (`.`, `!`, `?`, `…`).
pub fn pause_count(text: &str) -> usize {
    text.chars()
        .filter(|c| matches!(c, '.' | '!' | '?' | '…'))
        .count()
}

/// Strip everything but letters and apostrophes, lowercased.
fn bare_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphabetic() || *c == '\'')
        .flat_map(char::to_lowercase)
        .collect()
}

/// True for all-caps words with at least two letters ("NOW", "DON'T").
pub(crate) fn is_capitalized_run(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

fn count_ellipses(text: &str) -> usize {
    text.matches("...").count() + text.matches('…').count()
}

fn mean_sentence_words(text: &str) -> f64 {
    let lengths: Vec<usize> = text
        .split(|c: char| matches!(c, '.' | '!' | '?' | '…'))
        .map(|s| s.split_whitespace().count())
        .filter(|&n| n > 0)
        .collect();
    if lengths.is_empty() {
        return 0.0;
    }
    lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
}

fn classify_mood(intensity: f64, keyword_density: f64, rhythm: f64) -> ContextualMood {
    if intensity >= PASSIONATE_INTENSITY {
        ContextualMood::Passionate
    } else if intensity >= BUILDING_INTENSITY {
        ContextualMood::Building
    } else if keyword_density >= INTIMATE_KEYWORD_DENSITY {
        ContextualMood::Intimate
    } else if rhythm > 0.0 && rhythm < PLAYFUL_RHYTHM {
        ContextualMood::Playful
    } else {
        ContextualMood::Calm
    }
}

/// Analyze one segment's text.
pub fn analyze(text: &str, config: &VoiceConfig) -> TextAnalysis {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return TextAnalysis {
            intensity: 0.0,
            rhythm: 0.0,
            keyword_density: 0.0,
            mood: ContextualMood::Calm,
        };
    }
    let n_words = words.len() as f64;

    let exclamations = text.matches('!').count() as f64;
    let questions = text.matches('?').count() as f64;
    let ellipses = count_ellipses(text) as f64;
    let punctuation_density = (exclamations * EXCLAMATION_WEIGHT
        + questions * QUESTION_WEIGHT
        + ellipses * ELLIPSIS_WEIGHT)
        / n_words;

    let caps_ratio = words.iter().filter(|w| is_capitalized_run(w)).count() as f64 / n_words;

    let keyword_hits = words
        .iter()
        .map(|w| bare_word(w))
        .filter(|w| config.intensity_keywords.iter().any(|k| k == w))
        .count();
    let keyword_density = keyword_hits as f64 / n_words;

    let intensity = (punctuation_density * PUNCTUATION_SCALE
        + caps_ratio * CAPS_SCALE
        + keyword_density * KEYWORD_SCALE)
        .clamp(0.0, 1.0);

    let rhythm = if config.rhythm_reference_words > 0.0 {
        (mean_sentence_words(text) / config.rhythm_reference_words).clamp(0.0, 1.0)
    } else {
        0.0
    };

    TextAnalysis {
        intensity,
        rhythm,
        keyword_density,
        mood: classify_mood(intensity, keyword_density, rhythm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VoiceConfig {
        VoiceConfig::default()
    }

    #[test]
    fn test_pause_count() {
        assert_eq!(pause_count("One. Two! Three?"), 3);
        assert_eq!(pause_count("no punctuation here"), 0);
        assert_eq!(pause_count("a, b; c"), 0);
    }

    #[test]
    fn test_pause_count_ellipsis() {
        // the single-character ellipsis is one mark, "..." is three
        assert_eq!(pause_count("Wait… closer…"), 2);
        assert_eq!(pause_count("Wait... closer"), 3);
    }

    #[test]
    fn test_empty_text_is_calm() {
        let a = analyze("   ", &config());
        assert_eq!(a.intensity, 0.0);
        assert_eq!(a.mood, ContextualMood::Calm);
    }

    #[test]
    fn test_plain_narration_low_intensity() {
        let a = analyze(
            "The evening light settled slowly over the quiet harbor and the boats rocked gently.",
            &config(),
        );
        assert!(a.intensity < 0.1, "intensity={}", a.intensity);
        assert_eq!(a.mood, ContextualMood::Calm);
    }

    #[test]
    fn test_shouting_is_passionate() {
        let a = analyze("YES! Please, NOW! I need you!", &config());
        assert!(a.intensity >= 0.7, "intensity={}", a.intensity);
        assert_eq!(a.mood, ContextualMood::Passionate);
    }

    #[test]
    fn test_keywords_raise_density() {
        let a = analyze("Come closer and breathe with me tonight by the fire", &config());
        assert!(a.keyword_density > 0.0);
        assert!(a.intensity > 0.0);
    }

    #[test]
    fn test_rhythm_scales_with_sentence_length() {
        let short = analyze("Go. Stop. Wait. Run.", &config());
        let long = analyze(
            "She walked along the shoreline for a very long time thinking about everything that had happened.",
            &config(),
        );
        assert!(short.rhythm < long.rhythm);
        assert!(long.rhythm <= 1.0);
        assert_eq!(short.mood, ContextualMood::Playful);
    }

    #[test]
    fn test_capitalized_run() {
        assert!(is_capitalized_run("NOW!"));
        assert!(is_capitalized_run("DON'T"));
        assert!(!is_capitalized_run("I"));
        assert!(!is_capitalized_run("Now"));
    }
}
