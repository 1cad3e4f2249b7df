use chatbridge_types::Message;

use crate::render::render_part;

/// Picks the messages belonging to the turn that started when the session
/// held `before_count` messages.
///
/// The polled snapshot replaces its refetched copy when the copy is less
/// settled, and is appended when the refetch does not contain it yet.
pub fn select_turn(all: Vec<Message>, before_count: usize, polled: &Message) -> Vec<Message> {
    let mut selected: Vec<Message> = all.into_iter().skip(before_count).collect();

    match selected.iter_mut().find(|m| m.id() == polled.id()) {
        Some(existing) => {
            if !existing.is_settled() && polled.is_settled() {
                *existing = polled.clone();
            }
        }
        None => selected.push(polled.clone()),
    }

    selected
}

/// Renders every part of every selected message in message order, then part
/// order. The echoed user prompt is part of the window and renders too.
pub fn aggregate(messages: &[Message]) -> String {
    messages
        .iter()
        .flat_map(|m| m.parts.iter())
        .map(render_part)
        .collect()
}
