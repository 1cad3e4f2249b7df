use chatbridge_types::{ChatMessage, Usage};

/// Roughly four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4)
}

pub fn estimate_usage(messages: &[ChatMessage], completion: &str) -> Usage {
    let prompt_tokens = messages.iter().map(|m| estimate_tokens(&m.text())).sum();
    Usage::new(prompt_tokens, estimate_tokens(completion))
}
