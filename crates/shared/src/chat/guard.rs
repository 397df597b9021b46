use std::sync::LazyLock;

use regex::RegexSet;
use thiserror::Error;

use crate::models::HistoryEntry;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_SESSION_ID_CHARS: usize = 128;

const INJECTION_PATTERNS: &[&str] = &[
    r"(?i)<\s*script\b",
    r"(?i)<\s*/\s*script\s*>",
    r"(?i)<\s*iframe\b",
    // Any on*= attribute inside a tag; plain prose like "one = 1" has no tag.
    r"(?i)<[^>]*\bon[a-z]+\s*=",
    r"(?i)javascript\s*:",
    r"(?i)vbscript\s*:",
    r"(?i)data\s*:\s*text/html",
    r"(?i)\bdrop\s+(?:table|database|schema)\b",
    r"(?i)\bdelete\s+from\b",
    r"(?i)\binsert\s+into\b",
    r"(?i)\bupdate\s+\w+\s+set\b",
    r"(?i)\btruncate\s+table\b",
    r"(?i)\balter\s+table\b",
    r"(?i)\bunion\s+(?:all\s+)?select\b",
];

static INJECTION_SET: LazyLock<Result<RegexSet, regex::Error>> =
    LazyLock::new(|| RegexSet::new(INJECTION_PATTERNS));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejection {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Message must be at most {max} characters")]
    MessageTooLong { max: usize },
    #[error("sessionId is required")]
    MissingSession,
    #[error("sessionId must be at most {max} characters")]
    SessionTooLong { max: usize },
    #[error("Invalid input detected")]
    UnsafeContent,
}

impl InputRejection {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "empty_message",
            Self::MessageTooLong { .. } => "message_too_long",
            Self::MissingSession => "missing_session_id",
            Self::SessionTooLong { .. } => "session_id_too_long",
            Self::UnsafeContent => "invalid_input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedChatInput {
    pub message: String,
    pub session_id: String,
}

/// Validates one visitor turn. Pure; runs before any store or network call.
pub fn check_chat_input(
    message: &str,
    session_id: &str,
) -> Result<AcceptedChatInput, InputRejection> {
    let message = message.trim();
    if message.is_empty() {
        return Err(InputRejection::EmptyMessage);
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(InputRejection::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
        });
    }

    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(InputRejection::MissingSession);
    }
    if session_id.chars().count() > MAX_SESSION_ID_CHARS {
        return Err(InputRejection::SessionTooLong {
            max: MAX_SESSION_ID_CHARS,
        });
    }

    if looks_unsafe(message) {
        return Err(InputRejection::UnsafeContent);
    }

    Ok(AcceptedChatInput {
        message: message.to_string(),
        session_id: session_id.to_string(),
    })
}

/// Client-supplied history is untrusted: unsafe or blank entries are dropped.
pub fn sanitize_history_entry(entry: &HistoryEntry) -> Option<HistoryEntry> {
    let message = entry.message.trim();
    if message.is_empty() || looks_unsafe(message) {
        return None;
    }

    Some(HistoryEntry {
        message: message.chars().take(MAX_MESSAGE_CHARS).collect(),
        is_user: entry.is_user,
    })
}

fn looks_unsafe(text: &str) -> bool {
    match INJECTION_SET.as_ref() {
        Ok(set) => set.is_match(text),
        // Fail closed if the pattern table ever stops compiling.
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InputRejection, MAX_MESSAGE_CHARS, MAX_SESSION_ID_CHARS, INJECTION_SET, check_chat_input,
        sanitize_history_entry,
    };
    use crate::models::HistoryEntry;

    #[test]
    fn pattern_table_compiles() {
        assert!(INJECTION_SET.is_ok());
    }

    #[test]
    fn accepts_and_trims_plain_questions() {
        let accepted = check_chat_input("  What did you build at Acme?  ", " s-1 ")
            .expect("plain question should pass");
        assert_eq!(accepted.message, "What did you build at Acme?");
        assert_eq!(accepted.session_id, "s-1");
    }

    #[test]
    fn rejects_blank_messages() {
        assert_eq!(
            check_chat_input("   \n\t", "s-1"),
            Err(InputRejection::EmptyMessage)
        );
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        let at_limit = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(check_chat_input(&at_limit, "s-1").is_ok());

        let over_limit = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            check_chat_input(&over_limit, "s-1"),
            Err(InputRejection::MessageTooLong {
                max: MAX_MESSAGE_CHARS
            })
        );
    }

    #[test]
    fn rejects_missing_or_oversized_session_ids() {
        assert_eq!(
            check_chat_input("hello", "  "),
            Err(InputRejection::MissingSession)
        );
        let long_session = "s".repeat(MAX_SESSION_ID_CHARS + 1);
        assert_eq!(
            check_chat_input("hello", &long_session),
            Err(InputRejection::SessionTooLong {
                max: MAX_SESSION_ID_CHARS
            })
        );
    }

    #[test]
    fn rejects_markup_and_sql_injection() {
        for attempt in [
            "<script>alert(1)</script>",
            "hi <SCRIPT src=x>",
            "<iframe src='//evil'>",
            "<img src=x onerror=alert(1)>",
            "<details open ontoggle=alert(1)>",
            "<div onmouseenter=alert(1)>",
            "<svg onanimationstart=alert(1)>",
            "<body onpageshow=alert(1)>",
            "<a onpointerdown=alert(1)>",
            "<img/onload = alert(1)>",
            "click javascript:alert(1)",
            "data:text/html;base64,AAAA",
            "'; DROP TABLE users; --",
            "delete from chat_messages",
            "INSERT INTO projects VALUES (1)",
            "update profile set name='x'",
            "1 UNION SELECT password FROM users",
            "1 union all select 1",
            "truncate table skills",
            "ALTER TABLE x ADD y int",
        ] {
            assert_eq!(
                check_chat_input(attempt, "s-1"),
                Err(InputRejection::UnsafeContent),
                "expected rejection for {attempt:?}"
            );
        }
    }

    #[test]
    fn ordinary_words_do_not_trip_patterns() {
        for question in [
            "Can you update me on your latest project?",
            "How did you select your tech stack?",
            "What was your role in the data migration?",
            "Did you drop out of any course?",
            "Tell me about the union of your interests in design and code",
            "In your notes one = 1, right?",
            "Did the button onclick handler need a rewrite?",
        ] {
            assert!(
                check_chat_input(question, "s-1").is_ok(),
                "unexpected rejection for {question:?}"
            );
        }
    }

    #[test]
    fn unsafe_content_message_is_generic() {
        assert_eq!(
            InputRejection::UnsafeContent.to_string(),
            "Invalid input detected"
        );
    }

    #[test]
    fn history_sanitizer_drops_unsafe_and_blank_entries() {
        let unsafe_entry = HistoryEntry {
            message: "<script>x</script>".to_string(),
            is_user: true,
        };
        let blank_entry = HistoryEntry {
            message: "   ".to_string(),
            is_user: false,
        };
        let long_entry = HistoryEntry {
            message: format!(" {} ", "b".repeat(MAX_MESSAGE_CHARS + 50)),
            is_user: false,
        };

        assert!(sanitize_history_entry(&unsafe_entry).is_none());
        assert!(sanitize_history_entry(&blank_entry).is_none());
        let kept = sanitize_history_entry(&long_entry).expect("long entry is truncated");
        assert_eq!(kept.message.chars().count(), MAX_MESSAGE_CHARS);
        assert!(!kept.is_user);
    }
}
