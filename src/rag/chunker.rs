//! Semantic text chunker.
//!
//! Splits content on blank-line section boundaries and greedily packs sections
//! into chunks of roughly `target_size` characters. Sections that carry links or
//! list items may stretch a chunk up to `extended_size` so they stay together.
//! Sections longer than `extended_size` are broken at sentence boundaries
//! (or, failing that, line boundaries) and re-packed with the same rules.
//!
//! All sizes are counted in characters, not bytes.

use std::sync::OnceLock;

use regex::Regex;

use super::types::Chunk;
use crate::core::config::defaults::{EXTENDED_CHUNK_SIZE, TARGET_CHUNK_SIZE};
use crate::core::config::ChunkerSettings;

const SECTION_SEPARATOR: &str = "\n\n";
const SENTENCE_SEPARATOR: &str = " ";
const LINE_SEPARATOR: &str = "\n";

const URL_MARKERS: [&str; 5] = ["http://", "https://", "www.", ".com", ".org"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticChunker {
    target_size: usize,
    extended_size: usize,
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new(TARGET_CHUNK_SIZE, EXTENDED_CHUNK_SIZE)
    }
}

impl SemanticChunker {
    /// `extended_size` is raised to `target_size` if configured below it.
    pub fn new(target_size: usize, extended_size: usize) -> Self {
        let target_size = target_size.max(1);
        Self {
            target_size,
            extended_size: extended_size.max(target_size),
        }
    }

    pub fn from_settings(settings: &ChunkerSettings) -> Self {
        Self::new(settings.target_size, settings.extended_size)
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn extended_size(&self) -> usize {
        self.extended_size
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.target_size {
            return vec![Chunk::new(0, text)];
        }

        let mut flushed = Vec::new();
        let mut current = Accumulator::new(SECTION_SEPARATOR);

        for section in split_sections(text) {
            if char_len(section) > self.extended_size {
                self.absorb_oversized(section, &mut current, &mut flushed);
            } else {
                self.offer(&mut current, section, &mut flushed);
            }
        }
        current.flush_into(&mut flushed);

        flushed
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk::new(index, text))
            .collect()
    }

    /// Greedy acceptance test shared by sections and sentence/line pieces.
    fn offer(&self, current: &mut Accumulator, piece: &str, flushed: &mut Vec<String>) {
        let combined = current.size_with(char_len(piece));
        let accept = current.is_empty()
            || combined <= self.target_size
            || (is_special(piece) && combined <= self.extended_size);

        if !accept {
            current.flush_into(flushed);
        }
        current.push(piece);
    }

    fn absorb_oversized(&self, section: &str, current: &mut Accumulator, flushed: &mut Vec<String>) {
        let (pieces, separator) = self.split_oversized(section);

        let mut packer = Accumulator::new(separator);
        let mut packed = Vec::new();
        for piece in &pieces {
            self.offer(&mut packer, piece, &mut packed);
        }
        packer.flush_into(&mut packed);

        let mut packed = packed.into_iter();
        if let Some(first) = packed.next() {
            let fits_open_chunk =
                !current.is_empty() && current.size_with(char_len(&first)) <= self.extended_size;
            if !fits_open_chunk {
                current.flush_into(flushed);
            }
            current.push(&first);
        }
        // The last packed piece stays open so following sections can join it.
        for rest in packed {
            current.flush_into(flushed);
            current.push(&rest);
        }
    }

    fn split_oversized<'a>(&self, section: &'a str) -> (Vec<&'a str>, &'static str) {
        let sentences = split_sentences(section);
        if sentences.len() > 1 {
            let pieces = sentences
                .into_iter()
                .flat_map(|sentence| {
                    if char_len(sentence) > self.extended_size {
                        split_lines(sentence)
                    } else {
                        vec![sentence]
                    }
                })
                .collect();
            return (pieces, SENTENCE_SEPARATOR);
        }

        let lines = split_lines(section);
        if lines.len() > 1 {
            return (lines, LINE_SEPARATOR);
        }

        (vec![section], SENTENCE_SEPARATOR)
    }
}

/// Running chunk under construction.
struct Accumulator {
    text: String,
    size: usize,
    separator: &'static str,
}

impl Accumulator {
    fn new(separator: &'static str) -> Self {
        Self {
            text: String::new(),
            size: 0,
            separator,
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn size_with(&self, piece_size: usize) -> usize {
        if self.is_empty() {
            piece_size
        } else {
            self.size + char_len(self.separator) + piece_size
        }
    }

    fn push(&mut self, piece: &str) {
        self.size = self.size_with(char_len(piece));
        if !self.text.is_empty() {
            self.text.push_str(self.separator);
        }
        self.text.push_str(piece);
    }

    fn flush_into(&mut self, flushed: &mut Vec<String>) {
        if !self.text.is_empty() {
            flushed.push(std::mem::take(&mut self.text));
        }
        self.size = 0;
    }
}

/// A section with a link or a list item.
pub fn is_special(section: &str) -> bool {
    URL_MARKERS.iter().any(|marker| section.contains(marker)) || list_marker().is_match(section)
}

fn split_sections(text: &str) -> Vec<&str> {
    blank_line().split(text).map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn split_sentences(section: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_end().find_iter(section) {
        let sentence = section[start..boundary.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = boundary.end();
    }
    let tail = section[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn split_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn blank_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t\r\f\v]*\n\s*").expect("blank-line pattern is valid"))
}

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("sentence pattern is valid"))
}

fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*(?:[-•*·] |\d+\. )").expect("list pattern is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(seed: &str, sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("{} sentence number {} talks about the product line.", seed, i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sample_document() -> String {
        [
            paragraph("Overview", 4),
            paragraph("Services", 9),
            "- Free consultation\n- Same-day support\n- Annual maintenance plans".to_string(),
            paragraph("Pricing", 30),
            "Visit https://example.com/contact or call us.".to_string(),
            paragraph("History", 6),
        ]
        .join("\n\n")
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = SemanticChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  \n\n \t ").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = SemanticChunker::default();
        let chunks = chunker.chunk("  Opening hours are 9 to 5.\n\nClosed Sundays.  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Opening hours are 9 to 5.\n\nClosed Sundays.");
    }

    #[test]
    fn chunking_is_idempotent() {
        let chunker = SemanticChunker::default();
        let doc = sample_document();
        assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
    }

    #[test]
    fn chunks_respect_extended_size() {
        let chunker = SemanticChunker::default();
        let chunks = chunker.chunk(&sample_document());

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.char_len() <= chunker.extended_size(),
                "chunk {} has {} chars",
                chunk.index,
                chunk.char_len()
            );
        }
    }

    #[test]
    fn indices_are_sequential() {
        let chunks = SemanticChunker::default().chunk(&sample_document());
        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, expected);
        }
    }

    #[test]
    fn no_text_is_lost() {
        let doc = sample_document();
        let chunks = SemanticChunker::default().chunk(&doc);
        let squash = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        let rebuilt = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(squash(&rebuilt), squash(&doc));
    }

    #[test]
    fn url_section_under_extended_size_is_never_split() {
        let chunker = SemanticChunker::default();
        let mut link_section = String::from("Resources: https://example.com/docs ");
        while link_section.chars().count() < 1100 {
            link_section.push_str("more detail ");
        }
        link_section.truncate(1100);
        let link_section = link_section.trim().to_string();

        let doc = format!(
            "{}\n\n{}\n\n{}",
            "a".repeat(300),
            link_section,
            "b".repeat(300)
        );
        let chunks = chunker.chunk(&doc);

        assert!(chunks.iter().any(|c| c.text.contains(&link_section)));
        assert_eq!(
            chunks
                .iter()
                .filter(|c| c.text.contains("https://example.com/docs"))
                .count(),
            1
        );
    }

    #[test]
    fn special_section_may_stretch_past_target() {
        let chunker = SemanticChunker::new(100, 200);
        let plain = "x".repeat(60);
        let list = "- one\n- two\n- three\n- four\n- five\n- six";
        let doc = format!("{}\n\n{}\n\n{}", plain, list, "y".repeat(60));
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks[0].text, format!("{}\n\n{}", plain, list));
        assert_eq!(chunks[1].text, "y".repeat(60));
    }

    #[test]
    fn plain_sections_flush_at_target() {
        let chunker = SemanticChunker::new(100, 200);
        let doc = format!("{}\n\n{}", "x".repeat(60), "y".repeat(60));
        let chunks = chunker.chunk(&doc);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn oversized_section_splits_on_sentences() {
        let chunker = SemanticChunker::new(100, 150);
        let section = paragraph("Long", 10);
        let chunks = chunker.chunk(&section);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 150);
            assert!(chunk.text.ends_with('.'));
        }
    }

    #[test]
    fn oversized_section_without_sentences_splits_on_lines() {
        let chunker = SemanticChunker::new(50, 80);
        let section = (0..12)
            .map(|i| format!("line item {} without punctuation", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunker.chunk(&section);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 80);
        }
    }

    #[test]
    fn atomic_oversized_sentence_is_kept_whole() {
        let chunker = SemanticChunker::new(50, 80);
        let giant = "z".repeat(300);
        let doc = format!("Intro text here.\n\n{}\n\nOutro text here.", giant);
        let chunks = chunker.chunk(&doc);

        let holder: Vec<&Chunk> = chunks.iter().filter(|c| c.text.contains(&giant)).collect();
        assert_eq!(holder.len(), 1);
        assert_eq!(holder[0].text, giant);
        assert_eq!(chunks.first().unwrap().text, "Intro text here.");
        assert_eq!(chunks.last().unwrap().text, "Outro text here.");
    }

    #[test]
    fn packed_remainder_merges_into_open_chunk() {
        let chunker = SemanticChunker::new(60, 120);
        let lead = "Short lead.";
        let long = "First part of a long section here. Second part continues on. \
                    Third part keeps going now. Fourth part ends it. \
                    Fifth part wraps things up nicely.";
        let doc = format!("{}\n\n{}", lead, long);
        let chunks = chunker.chunk(&doc);

        assert!(chunks[0].text.starts_with(lead));
        assert!(chunks[0].text.contains("First part"));
        for chunk in &chunks {
            assert!(chunk.char_len() <= 120);
        }
    }

    #[test]
    fn special_detection() {
        assert!(is_special("see www.example.org"));
        assert!(is_special("Intro\n- bullet"));
        assert!(is_special("Steps:\n1. Open the app"));
        assert!(is_special("• item"));
        assert!(!is_special("Version 3.5 shipped in May."));
        assert!(!is_special("A well-known fact"));
    }

    #[test]
    fn extended_is_never_below_target() {
        let chunker = SemanticChunker::new(500, 100);
        assert_eq!(chunker.extended_size(), 500);
    }
}
