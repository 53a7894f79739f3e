//! Document chunking
//!
//! Splits a document into chunks of at most `max_chars` characters:
//!
//! - paragraphs (separated by blank lines) are the preferred unit
//! - oversize paragraphs are split on Unicode sentence boundaries
//! - oversize sentences are split on whitespace
//! - oversize words are hard-split on character boundaries
//!
//! Units are packed greedily. Paragraphs are joined with a blank line and
//! pieces of the same paragraph with a single space.

use anyhow::{anyhow, Result};
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::models::ChunkingConfig;

const PARAGRAPH_SEP: &str = "\n\n";
const WORD_SEP: &str = " ";

/// A piece of text plus the separator that joins it to the previous piece.
#[derive(Debug)]
struct Unit {
    text: String,
    sep: &'static str,
}

/// Paragraph-aware text chunker
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Create a new chunker with custom configuration
    pub fn with_config(config: ChunkingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid chunking config: {}", e))?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks; whitespace-only input yields no chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let max = self.config.max_chars;
        let mut units = Vec::new();
        for (index, paragraph) in paragraphs(text).into_iter().enumerate() {
            let start = units.len();
            split_paragraph(&paragraph, max, &mut units);
            if index > 0 {
                if let Some(first) = units.get_mut(start) {
                    first.sep = PARAGRAPH_SEP;
                }
            }
        }
        self.pack(units)
    }

    fn pack(&self, units: Vec<Unit>) -> Vec<String> {
        let max = self.config.max_chars;
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for unit in units {
            let unit_len = char_len(&unit.text);
            if current.is_empty() {
                current = unit.text;
                current_len = unit_len;
            } else if current_len + unit.sep.len() + unit_len <= max {
                current.push_str(unit.sep);
                current.push_str(&unit.text);
                current_len += unit.sep.len() + unit_len;
            } else {
                let previous = std::mem::take(&mut current);
                let tail = overlap_tail(&previous, self.config.overlap_chars);
                chunks.push(previous);

                let tail_len = char_len(&tail);
                if !tail.is_empty() && tail_len + WORD_SEP.len() + unit_len <= max {
                    current = tail;
                    current.push_str(WORD_SEP);
                    current.push_str(&unit.text);
                    current_len = tail_len + WORD_SEP.len() + unit_len;
                } else {
                    current = unit.text;
                    current_len = unit_len;
                }
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Blank-line separated paragraphs, trimmed, empty ones dropped
fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

fn split_paragraph(paragraph: &str, max: usize, units: &mut Vec<Unit>) {
    if char_len(paragraph) <= max {
        units.push(Unit {
            text: paragraph.to_string(),
            sep: WORD_SEP,
        });
        return;
    }

    for sentence in paragraph.split_sentence_bounds() {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if char_len(sentence) <= max {
            units.push(Unit {
                text: sentence.to_string(),
                sep: WORD_SEP,
            });
            continue;
        }
        for word in sentence.split_whitespace() {
            if char_len(word) <= max {
                units.push(Unit {
                    text: word.to_string(),
                    sep: WORD_SEP,
                });
            } else {
                hard_split(word, max, units);
            }
        }
    }
}

fn hard_split(word: &str, max: usize, units: &mut Vec<Unit>) {
    let chars: Vec<char> = word.chars().collect();
    for (index, piece) in chars.chunks(max).enumerate() {
        units.push(Unit {
            text: piece.iter().collect(),
            sep: if index == 0 { WORD_SEP } else { "" },
        });
    }
}

/// Longest run of trailing whole words fitting in `budget` characters
fn overlap_tail(chunk: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }

    let mut words: Vec<&str> = Vec::new();
    let mut used = 0;
    for word in chunk.split_whitespace().rev() {
        let extra = char_len(word) + usize::from(!words.is_empty());
        if used + extra > budget {
            break;
        }
        used += extra;
        words.push(word);
    }
    words.reverse();
    words.join(" ")
}
