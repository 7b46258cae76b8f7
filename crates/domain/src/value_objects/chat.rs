//! Role-tagged chat history entries.

use serde::{Deserialize, Serialize};

/// Author of a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The player.
    User,
    /// The NPC's generated reply.
    Ai,
    /// Injected narrative events (quest accepted/completed, items received).
    System,
}

/// One ordered entry in an NPC's chat history.
///
/// Stored as a `(role, content)` tuple to keep save documents compact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry(pub ChatRole, pub String);

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self(ChatRole::User, content.into())
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self(ChatRole::Ai, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self(ChatRole::System, content.into())
    }

    pub fn role(&self) -> ChatRole {
        self.0
    }

    pub fn content(&self) -> &str {
        &self.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_role_content_tuple() {
        let entry = ChatEntry::user("hello");
        let json = serde_json::to_string(&entry).expect("serialize");
        assert_eq!(json, r#"["user","hello"]"#);

        let back: ChatEntry = serde_json::from_str(r#"["ai","well met"]"#).expect("deserialize");
        assert_eq!(back.role(), ChatRole::Ai);
        assert_eq!(back.content(), "well met");
    }
}
