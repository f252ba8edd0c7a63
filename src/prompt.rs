//! Conversation flattening.
//!
//! The wrapped CLI accepts one prompt string per invocation and has no
//! native multi-turn input, so the structured message array is serialized
//! into a single transcript. The system prompt travels separately because
//! the CLI takes it as its own flag.

use crate::models::ChatMessage;

/// A message array flattened into CLI argument form.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedPrompt {
    /// Content of the last system message, if any.
    pub system: Option<String>,
    /// Remaining turns as `Human:` / `Assistant:` lines, blank-line separated.
    pub transcript: String,
}

/// Flatten a validated message array. When several system messages are
/// present, the last one wins.
pub fn flatten(messages: &[ChatMessage]) -> FlattenedPrompt {
    let mut system = None;
    let mut turns = Vec::new();

    for msg in messages {
        match msg.role.as_str() {
            "system" => system = Some(msg.content.clone()),
            "assistant" => turns.push(format!("Assistant: {}", msg.content)),
            // Anything non-assistant speaks as the human.
            _ => turns.push(format!("Human: {}", msg.content)),
        }
    }

    FlattenedPrompt {
        system,
        transcript: turns.join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn single_user_message() {
        let p = flatten(&[msg("user", "hello")]);
        assert_eq!(p.system, None);
        assert_eq!(p.transcript, "Human: hello");
    }

    #[test]
    fn turns_are_prefixed_and_blank_line_separated() {
        let p = flatten(&[
            msg("user", "hi"),
            msg("assistant", "hello!"),
            msg("user", "make a button"),
        ]);
        assert_eq!(
            p.transcript,
            "Human: hi\n\nAssistant: hello!\n\nHuman: make a button"
        );
    }

    #[test]
    fn last_system_message_wins() {
        let p = flatten(&[
            msg("system", "first"),
            msg("user", "hi"),
            msg("system", "second"),
        ]);
        assert_eq!(p.system.as_deref(), Some("second"));
        assert_eq!(p.transcript, "Human: hi");
    }

    #[test]
    fn system_messages_are_not_in_the_transcript() {
        let p = flatten(&[msg("system", "be terse"), msg("user", "hi")]);
        assert!(!p.transcript.contains("be terse"));
    }

    #[test]
    fn unknown_roles_flatten_as_human() {
        let p = flatten(&[msg("tool", "output")]);
        assert_eq!(p.transcript, "Human: output");
    }
}
