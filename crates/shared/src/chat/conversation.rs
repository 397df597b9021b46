use crate::llm::gateway::ChatMessage;
use crate::llm::prompts::{PersonaPrompt, category_focus};
use crate::models::{CategoryLabel, ChatTurn, HistoryEntry};

use super::guard::sanitize_history_entry;
use super::snapshot::Snapshot;

/// Prior turns forwarded to the model, most recent last.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorTurn {
    pub message: String,
    pub is_user: bool,
}

impl From<&ChatTurn> for PriorTurn {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            message: turn.message.clone(),
            is_user: turn.is_user,
        }
    }
}

/// Client-supplied history, with unsafe or blank entries removed.
pub fn prior_turns_from_history(history: &[HistoryEntry]) -> Vec<PriorTurn> {
    history
        .iter()
        .filter_map(sanitize_history_entry)
        .map(|entry| PriorTurn {
            message: entry.message,
            is_user: entry.is_user,
        })
        .collect()
}

pub fn assemble_conversation(
    persona: &PersonaPrompt,
    snapshot: &Snapshot,
    category: CategoryLabel,
    history: &[PriorTurn],
    new_message: &str,
) -> Vec<ChatMessage> {
    let window_start = history.len().saturating_sub(HISTORY_WINDOW);
    let window = &history[window_start..];

    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(ChatMessage::system(system_prompt(persona, snapshot, category)));
    messages.extend(window.iter().map(|turn| {
        if turn.is_user {
            ChatMessage::user(turn.message.as_str())
        } else {
            ChatMessage::assistant(turn.message.as_str())
        }
    }));
    messages.push(ChatMessage::user(new_message));

    messages
}

fn system_prompt(persona: &PersonaPrompt, snapshot: &Snapshot, category: CategoryLabel) -> String {
    let mut prompt = String::from(persona.identity);
    prompt.push_str("\n\nRules:\n");
    for rule in persona.rules {
        prompt.push_str("- ");
        prompt.push_str(rule);
        prompt.push('\n');
    }

    if let Some(focus) = category_focus(category) {
        prompt.push('\n');
        prompt.push_str(focus);
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(persona.context_heading);
    prompt.push('\n');
    prompt.push_str(&snapshot.text);
    prompt
}
