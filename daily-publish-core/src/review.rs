//! Human review of generated texts and audio assets.
//!
//! A text moves `Presented -> {Accepted, Editing, Regenerating} -> Rated -> Final`.
//! Regeneration loops back to `Presented` with no cap; only the reviewer ends it.
//! A text never leaves the loop as final without a 1..=100 rating.

use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::contract::{AudioPlayer, Prompt};
use crate::error::PromptError;
use crate::markov::MarkovChain;
use crate::model::GeneratedText;

/// Rating used for audio when the reviewer just presses enter.
pub const DEFAULT_AUDIO_RATING: u8 = 50;

/// Outcome of presenting one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Accepted as-is, or replaced by an edit.
    Accepted(String),
    Regenerate,
    Skip,
}

/// Show `candidate` and ask what to do with it.
pub async fn present(
    prompt: &dyn Prompt,
    label: &str,
    candidate: &str,
    chain_score: u8,
) -> Result<ReviewDecision, PromptError> {
    let question = format!(
        "\n{label} (chain score {chain_score}):\n  {candidate}\n[a]ccept, [e]dit, [r]egenerate or [s]kip? "
    );
    loop {
        let answer = prompt.ask(&question).await?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "" | "a" | "accept" => return Ok(ReviewDecision::Accepted(candidate.to_string())),
            "e" | "edit" => return edit(prompt, candidate).await,
            "r" | "regenerate" => return Ok(ReviewDecision::Regenerate),
            "s" | "skip" => return Ok(ReviewDecision::Skip),
            other => {
                debug!(answer = other, "[REVIEW] Unrecognised choice, asking again");
            }
        }
    }
}

/// Collect replacement text. Empty input keeps the original candidate.
async fn edit(prompt: &dyn Prompt, original: &str) -> Result<ReviewDecision, PromptError> {
    let replacement = prompt
        .ask("Replacement text (empty keeps the original): ")
        .await?;
    let replacement = replacement.trim();
    if replacement.is_empty() {
        info!("[REVIEW] Empty edit, keeping original candidate");
        Ok(ReviewDecision::Accepted(original.to_string()))
    } else {
        Ok(ReviewDecision::Accepted(replacement.to_string()))
    }
}

/// Ask for a 1..=100 rating until one is given. `default` answers an empty reply.
pub async fn ask_rating(
    prompt: &dyn Prompt,
    question: &str,
    default: Option<u8>,
) -> Result<u8, PromptError> {
    loop {
        let answer = prompt.ask(question).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            if let Some(rating) = default {
                return Ok(rating);
            }
        }
        match answer.parse::<u8>() {
            Ok(rating) if (1..=100).contains(&rating) => return Ok(rating),
            _ => warn!(answer, "[REVIEW] Rating must be a whole number from 1 to 100"),
        }
    }
}

/// Drive one text to `Final`, or `None` if the reviewer skipped it.
pub async fn review_text<R: Rng + ?Sized>(
    prompt: &dyn Prompt,
    chain: &MarkovChain,
    rng: &mut R,
    label: &str,
    candidate: String,
    max_words: usize,
) -> Result<Option<GeneratedText>, PromptError> {
    let mut candidate = candidate;
    let mut regenerations = 0usize;
    loop {
        let score = chain.score(&candidate);
        match present(prompt, label, &candidate, score).await? {
            ReviewDecision::Accepted(content) => {
                let rating = ask_rating(
                    prompt,
                    &format!("Coherency of {label} (1-100): "),
                    None,
                )
                .await?;
                info!(
                    label,
                    rating,
                    regenerations,
                    words = content.split_whitespace().count(),
                    "[REVIEW] Text finalized"
                );
                return Ok(Some(GeneratedText::new(content, rating)));
            }
            ReviewDecision::Regenerate => {
                regenerations += 1;
                candidate = chain.generate(rng, max_words);
                debug!(label, regenerations, candidate = %candidate, "[REVIEW] Regenerated candidate");
            }
            ReviewDecision::Skip => {
                info!(label, "[REVIEW] Text skipped by reviewer");
                return Ok(None);
            }
        }
    }
}

/// Offer playback, then ask for a rating (empty reply means [`DEFAULT_AUDIO_RATING`]).
/// A playback failure is logged and does not stop the rating.
pub async fn review_audio(
    prompt: &dyn Prompt,
    player: &dyn AudioPlayer,
    file_name: &str,
    path: &Path,
) -> Result<u8, PromptError> {
    let choice = prompt
        .ask(&format!("\nAudio {file_name}: [p]lay or [s]kip playback? "))
        .await?;
    if matches!(choice.trim().to_ascii_lowercase().as_str(), "p" | "play") {
        if let Err(e) = player.play(path).await {
            warn!(error = %e, file = file_name, "[REVIEW] Playback failed, rate without listening");
        }
    }
    let rating = ask_rating(
        prompt,
        &format!("Coherency of {file_name} (1-100) [{DEFAULT_AUDIO_RATING}]: "),
        Some(DEFAULT_AUDIO_RATING),
    )
    .await?;
    info!(file = file_name, rating, "[REVIEW] Audio rated");
    Ok(rating)
}
