//! First-order (bigram) word chain.
//!
//! Generation and scoring read the same adjacency map, so a score measures how
//! much of a text the corpus itself could have produced.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

/// Returned by [`MarkovChain::generate`] when the corpus has no capitalized word to start from.
pub const PLACEHOLDER_TEXT: &str = "The chain has nothing to say today.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkovChain {
    /// Successors per word, duplicates kept so frequent transitions are picked more often.
    /// Every word seen in the corpus is a key; an empty list marks a terminal.
    transitions: HashMap<String, Vec<String>>,
}

impl MarkovChain {
    /// Build a chain from corpus lines. Transitions never cross line boundaries.
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut transitions: HashMap<String, Vec<String>> = HashMap::new();
        for line in corpus {
            let words: Vec<&str> = line.as_ref().split_whitespace().collect();
            for word in &words {
                transitions.entry((*word).to_string()).or_default();
            }
            for pair in words.windows(2) {
                transitions
                    .entry(pair[0].to_string())
                    .or_default()
                    .push(pair[1].to_string());
            }
        }
        Self { transitions }
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn successors(&self, word: &str) -> &[String] {
        self.transitions.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_transition(&self, from: &str, to: &str) -> bool {
        self.successors(from).iter().any(|w| w == to)
    }

    /// Capitalized words, sorted so a seeded RNG picks the same start every time.
    fn start_words(&self) -> Vec<&str> {
        let mut starts: Vec<&str> = self
            .transitions
            .keys()
            .map(String::as_str)
            .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
            .collect();
        starts.sort_unstable();
        starts
    }

    /// Random walk from a random capitalized word until `max_words` words are
    /// emitted or a terminal is reached. A zero budget yields the placeholder.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, max_words: usize) -> String {
        if max_words == 0 {
            return PLACEHOLDER_TEXT.to_string();
        }
        let starts = self.start_words();
        let mut current = match starts.choose(rng) {
            Some(word) => *word,
            None => return PLACEHOLDER_TEXT.to_string(),
        };

        let mut walk: Vec<&str> = Vec::with_capacity(max_words);
        while walk.len() < max_words {
            walk.push(current);
            match self.successors(current).choose(rng) {
                Some(next) => current = next.as_str(),
                None => break,
            }
        }
        walk.join(" ")
    }

    /// Percentage (0..=100) of adjacent word pairs in `text` that the chain records.
    /// Texts with fewer than two words score 0.
    pub fn score(&self, text: &str) -> u8 {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < 2 {
            return 0;
        }
        let total = words.len() - 1;
        let coherent = words
            .windows(2)
            .filter(|pair| self.has_transition(pair[0], pair[1]))
            .count();
        (100.0 * coherent as f64 / total as f64).round() as u8
    }
}
