use std::collections::HashMap;

use battle_core::participant::Participant;
use battle_llm::models::display_name;

/// Prompt for participant `index` in `round`.
///
/// Round 0 is the bare question. Later rounds ask the participant to critique
/// the latest answer of the next participant in line, wrapping around.
pub fn build_prompt(
    question: &str,
    round: u32,
    index: usize,
    participants: &[Participant],
    latest: &HashMap<String, String>,
) -> String {
    if round == 0 || participants.is_empty() {
        return question.to_string();
    }

    let other = &participants[(index + 1) % participants.len()];
    let other_name = display_name(other.provider, &other.model_id);
    let other_response = latest
        .get(&other.response_key())
        .map(String::as_str)
        .unwrap_or_default();

    format!(
        "The other AI ({other_name}) responded:\n\n\"{other_response}\"\n\n\
         Please critique this response, point out any flaws or missing perspectives, \
         and provide your improved answer to the original question: {question}"
    )
}
