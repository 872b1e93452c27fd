//! Answer synthesis: context-window assembly, prompt construction, and
//! deterministic confidence scoring.
//!
//! Confidence comes from the retrieval signal, never from the generator's
//! own output. When nothing useful was retrieved the engine answers with a
//! fixed low-confidence fallback and skips the generation call entirely;
//! otherwise confidence grows monotonically with the top result's
//! similarity and the number of corroborating sources.

use crate::error::EngineResult;
use crate::generation::GenerationProvider;
use crate::models::{Answer, AnswerMethod, AnswerSource};
use crate::rank::RankedUnit;

/// Confidence attached to the "insufficient information" fallback.
pub const FALLBACK_CONFIDENCE: f32 = 0.1;

/// Confidence attached to direct-mode answers, which have no grounding.
pub const DIRECT_CONFIDENCE: f32 = 0.5;

/// Answer text returned when retrieval finds nothing usable.
pub const FALLBACK_ANSWER: &str =
    "The knowledge base does not contain enough information to answer that \
     question. Try ingesting more content, or ask in direct mode.";

/// Synthesis tuning, taken from the engine configuration.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Minimum top-result similarity for a grounded answer. Below this the
    /// fallback is returned without calling the generation provider.
    pub answer_floor: f32,
    /// Character budget for the assembled context window.
    pub max_context_chars: usize,
}

/// Produce a grounded answer from ranked retrieval results.
///
/// Chunks are appended to the context window in ranked order; once a chunk
/// would exceed the character budget it is dropped, never truncated
/// mid-text. The source list covers every ranked result, including chunks
/// dropped from the window.
pub async fn synthesize_grounded(
    generator: &dyn GenerationProvider,
    question: &str,
    ranked: &[RankedUnit],
    extra_context: Option<&str>,
    opts: &SynthesisOptions,
) -> EngineResult<Answer> {
    let below_floor = ranked
        .first()
        .map_or(true, |top| top.similarity < opts.answer_floor);
    if below_floor {
        return Ok(fallback_answer());
    }

    let (context, context_used) = build_context(ranked, extra_context, opts.max_context_chars);
    let prompt = grounded_prompt(question, &context);
    let answer = generator.complete(&prompt).await?;

    let sources: Vec<AnswerSource> = ranked
        .iter()
        .map(|r| AnswerSource {
            title: r.unit.title.clone(),
            category: r.unit.category.clone(),
            similarity: r.similarity,
        })
        .collect();

    let confidence = grounded_confidence(ranked[0].similarity, sources.len());

    Ok(Answer {
        answer,
        sources,
        context_used,
        confidence,
        method: AnswerMethod::Retrieval,
    })
}

/// Ask the generation provider directly, bypassing retrieval.
///
/// The source list is empty and confidence is a fixed constant reflecting
/// the absence of grounding.
pub async fn synthesize_direct(
    generator: &dyn GenerationProvider,
    question: &str,
    extra_context: Option<&str>,
) -> EngineResult<Answer> {
    let prompt = direct_prompt(question, extra_context);
    let answer = generator.complete(&prompt).await?;

    Ok(Answer {
        answer,
        sources: Vec::new(),
        context_used: Vec::new(),
        confidence: DIRECT_CONFIDENCE,
        method: AnswerMethod::Direct,
    })
}

/// The fixed low-confidence response used when retrieval comes up empty.
pub fn fallback_answer() -> Answer {
    Answer {
        answer: FALLBACK_ANSWER.to_string(),
        sources: Vec::new(),
        context_used: Vec::new(),
        confidence: FALLBACK_CONFIDENCE,
        method: AnswerMethod::Retrieval,
    }
}

/// Deterministic confidence for a grounded answer: monotonic in the top
/// similarity and the number of corroborating sources, capped at `1.0`.
pub fn grounded_confidence(top_similarity: f32, sources: usize) -> f32 {
    let corroboration = 0.05 * sources.saturating_sub(1) as f32;
    (top_similarity + corroboration).min(1.0)
}

/// Assemble the context window and the list of verbatim chunk texts used.
///
/// Caller-supplied extra context is prepended outside the chunk budget.
fn build_context(
    ranked: &[RankedUnit],
    extra_context: Option<&str>,
    max_chars: usize,
) -> (String, Vec<String>) {
    let mut context = String::new();
    let mut used = Vec::new();

    if let Some(extra) = extra_context {
        if !extra.trim().is_empty() {
            context.push_str("Additional context from the caller:\n");
            context.push_str(extra.trim());
            context.push_str("\n\n");
        }
    }

    let mut budget_spent = 0usize;
    for r in ranked {
        let block = format!("SOURCE: {}\n{}\n\n", r.unit.title, r.unit.text);
        let block_chars = block.chars().count();
        if budget_spent + block_chars > max_chars {
            break;
        }
        context.push_str(&block);
        used.push(r.unit.text.clone());
        budget_spent += block_chars;
    }

    (context, used)
}

fn grounded_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a careful assistant answering questions from an indexed \
         knowledge base. Answer using only the context below. Be specific \
         and practical, and if the context does not fully cover the \
         question, say so and answer with what the context supports.\n\n\
         Context:\n{context}\n\
         Question: {question}\n\n\
         Answer:"
    )
}

fn direct_prompt(question: &str, extra_context: Option<&str>) -> String {
    match extra_context.filter(|c| !c.trim().is_empty()) {
        Some(extra) => format!(
            "You are a helpful assistant.\n\nAdditional context: {}\n\nQuestion: {}\n\nAnswer:",
            extra.trim(),
            question
        ),
        None => format!("You are a helpful assistant.\n\nQuestion: {question}\n\nAnswer:"),
    }
}
