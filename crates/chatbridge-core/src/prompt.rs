use chatbridge_config::ModelsSettings;
use chatbridge_types::{ChatMessage, ModelRef};
use std::fmt::Write;

/// Folds an OpenAI conversation into the single prompt the agent receives,
/// one `[role]: content` line per non-empty message.
pub fn combine_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let text = message.text();
        if text.is_empty() {
            continue;
        }
        let _ = writeln!(prompt, "[{}]: {}", message.role, text);
    }
    prompt
}

/// `provider/model` is taken literally; anything else goes through the
/// alias table under the default provider. A reference with an empty side
/// (`/x`, `x/`) is not a provider reference and is sent whole as a model id
/// under the default provider.
pub fn map_model(model: &str, settings: &ModelsSettings) -> ModelRef {
    if let Some((provider, model_id)) = model.split_once('/') {
        if !provider.is_empty() && !model_id.is_empty() {
            return ModelRef::new(provider, model_id);
        }
    }
    let model_id = settings
        .aliases
        .get(model)
        .cloned()
        .unwrap_or_else(|| model.to_string());
    ModelRef::new(settings.default_provider.clone(), model_id)
}
