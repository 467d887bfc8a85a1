pub const MAX_PLAYER_NAME_LENGTH: usize = 20;
pub const DEFAULT_PLAYER_NAME: &str = "Player";

pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}

/// Chat text keeps its inner spacing but loses control characters.
pub fn sanitize_chat_message(message: &str, max_len: usize) -> Option<String> {
    let cleaned: String = message
        .trim()
        .chars()
        .filter(|ch| !ch.is_control())
        .take(max_len)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_collapse_whitespace_and_truncate() {
        assert_eq!(sanitize_player_name("  Ada   Lovelace ", "Player"), "Ada Lovelace");
        assert_eq!(sanitize_player_name("   ", "Player"), "Player");
        let long = "x".repeat(64);
        assert_eq!(sanitize_player_name(&long, "Player").len(), MAX_PLAYER_NAME_LENGTH);
    }

    #[test]
    fn chat_messages_drop_control_characters() {
        assert_eq!(sanitize_chat_message(" hi\u{7}  there ", 200).as_deref(), Some("hi  there"));
        assert_eq!(sanitize_chat_message("\n\t ", 200), None);
        assert_eq!(sanitize_chat_message("abcdef", 3).as_deref(), Some("abc"));
    }
}
