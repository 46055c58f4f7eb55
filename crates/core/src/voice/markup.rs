//! Structured speech markup: pauses, emphasis and a prosody wrapper.
//!
//! A [`Markup`] is plain text plus an ordered list of directives over byte
//! spans. It knows nothing about any provider's grammar; a
//! [`MarkupDialect`] serializes it. [`Ssml`] is the dialect shipped here.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::config::{ProsodyPattern, VoiceConfig};
use crate::voice::analysis::{is_capitalized_run, TextAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmphasisLevel {
    Moderate,
    Strong,
}

impl EmphasisLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EmphasisLevel::Moderate => "moderate",
            EmphasisLevel::Strong => "strong",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DirectiveKind {
    /// Silence inserted at a zero-width span
    Pause { ms: u32 },
    Emphasis { level: EmphasisLevel },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Byte range into [`Markup::text`]
    pub span: Range<usize>,
}

/// Annotated text for one synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Markup {
    text: String,
    prosody: ProsodyPattern,
    directives: Vec<Directive>,
}

impl Markup {
    /// Text with punctuation replaced by pauses and quotes removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prosody(&self) -> ProsodyPattern {
        self.prosody
    }

    /// Directives in text order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn pauses(&self) -> impl Iterator<Item = u32> + '_ {
        self.directives.iter().filter_map(|d| match d.kind {
            DirectiveKind::Pause { ms } => Some(ms),
            _ => None,
        })
    }

    pub fn emphasized(&self) -> impl Iterator<Item = (&str, EmphasisLevel)> + '_ {
        self.directives.iter().filter_map(|d| match d.kind {
            DirectiveKind::Emphasis { level } => Some((&self.text[d.span.clone()], level)),
            _ => None,
        })
    }

    pub fn to_ssml(&self) -> String {
        Ssml.render(self)
    }
}

/// Incrementally assembles a [`Markup`].
#[derive(Debug, Clone)]
pub struct MarkupBuilder {
    text: String,
    prosody: ProsodyPattern,
    directives: Vec<Directive>,
}

impl MarkupBuilder {
    pub fn new(prosody: ProsodyPattern) -> Self {
        Self {
            text: String::new(),
            prosody,
            directives: Vec::new(),
        }
    }

    /// Append a word. Emphasized words separated from the previous
    /// emphasis span only by whitespace extend that span.
    pub fn word(&mut self, word: &str, emphasis: Option<EmphasisLevel>) -> &mut Self {
        let start = self.text.len();
        self.text.push_str(word);
        let end = self.text.len();

        let Some(level) = emphasis else {
            return self;
        };
        if let Some(last) = self.directives.last_mut() {
            if last.kind == (DirectiveKind::Emphasis { level })
                && self.text[last.span.end..start].trim().is_empty()
            {
                last.span.end = end;
                return self;
            }
        }
        self.directives.push(Directive {
            kind: DirectiveKind::Emphasis { level },
            span: start..end,
        });
        self
    }

    /// Append a single separating space (collapses repeats).
    pub fn space(&mut self) -> &mut Self {
        if !self.text.is_empty() && !self.text.ends_with(' ') {
            self.text.push(' ');
        }
        self
    }

    pub fn pause(&mut self, ms: u32) -> &mut Self {
        let at = self.text.len();
        self.directives.push(Directive {
            kind: DirectiveKind::Pause { ms },
            span: at..at,
        });
        self
    }

    pub fn build(mut self) -> Markup {
        let trimmed = self.text.trim_end().len();
        self.text.truncate(trimmed);
        for d in &mut self.directives {
            d.span.start = d.span.start.min(trimmed);
            d.span.end = d.span.end.min(trimmed);
        }
        Markup {
            text: self.text,
            prosody: self.prosody,
            directives: self.directives,
        }
    }
}

/// Serializes a [`Markup`] into a provider's markup grammar.
pub trait MarkupDialect {
    fn render(&self, markup: &Markup) -> String;
}

/// W3C SSML.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ssml;

fn escape_xml(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

impl MarkupDialect for Ssml {
    fn render(&self, markup: &Markup) -> String {
        let p = markup.prosody;
        let mut out = format!(
            "<speak><prosody pitch=\"{:+}%\" rate=\"{}%\">",
            p.pitch_percent, p.rate_percent
        );
        let mut cursor = 0;
        for d in &markup.directives {
            escape_xml(&markup.text[cursor..d.span.start], &mut out);
            match d.kind {
                DirectiveKind::Pause { ms } => {
                    out.push_str(&format!("<break time=\"{}ms\"/>", ms));
                    cursor = d.span.start;
                }
                DirectiveKind::Emphasis { level } => {
                    out.push_str(&format!("<emphasis level=\"{}\">", level.as_str()));
                    escape_xml(&markup.text[d.span.clone()], &mut out);
                    out.push_str("</emphasis>");
                    cursor = d.span.end;
                }
            }
        }
        escape_xml(&markup.text[cursor..], &mut out);
        out.push_str("</prosody></speak>");
        out
    }
}

fn is_pause_char(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ',' | ';' | ':' | '…')
}

fn is_quote_char(c: char) -> bool {
    matches!(c, '"' | '“' | '”')
}

/// Pause length for a run of punctuation. The strongest mark wins.
fn pause_ms(run: &str, intensity: f64, config: &VoiceConfig) -> u32 {
    let f = &config.pause_factors;
    let mut factor: f64 = 0.0;
    if run.contains("...") || run.contains('…') {
        factor = factor.max(f.ellipsis);
    }
    for c in run.chars() {
        let class = match c {
            '!' => f.exclamation,
            '?' => f.question,
            ',' | ';' | ':' => f.comma,
            '.' => f.period,
            _ => 0.0,
        };
        factor = factor.max(class);
    }
    let base = config.base_pause_ms + config.intensity_pause_ms * intensity;
    (base * factor).round().max(0.0) as u32
}

/// Build the markup for one segment's text.
pub fn annotate(text: &str, analysis: &TextAnalysis, config: &VoiceConfig) -> Markup {
    let mut builder = MarkupBuilder::new(config.mood_patterns.get(analysis.mood));
    let level = if analysis.intensity > config.strong_emphasis_threshold {
        EmphasisLevel::Strong
    } else {
        EmphasisLevel::Moderate
    };

    let chars: Vec<char> = text.chars().collect();
    let mut in_quote = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            builder.space();
            i += 1;
        } else if is_quote_char(c) {
            in_quote = match c {
                '“' => true,
                '”' => false,
                _ => !in_quote,
            };
            i += 1;
        } else if is_pause_char(c) {
            let start = i;
            while i < chars.len() && is_pause_char(chars[i]) {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            builder.pause(pause_ms(&run, analysis.intensity, config));
        } else {
            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && !is_quote_char(chars[i])
                && !is_pause_char(chars[i])
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let emphasis = (in_quote || is_capitalized_run(&word)).then_some(level);
            builder.word(&word, emphasis);
        }
    }

    builder.build()
}
