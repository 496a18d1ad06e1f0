use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Model => "model",
            Role::Tool => "tool",
        }
    }
}

/// One recorded unit of conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Set only for tool turns.
    pub tool_name: Option<String>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_name: None,
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_name: Some(name.into()),
        }
    }
}

/// Append-only record of the whole session, in the exact order presented to
/// the model provider on every call. Never truncated or persisted.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::System, content));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::User, content));
    }

    pub fn push_model(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::Model, content));
    }

    pub fn push_tool(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.turns.push(Turn::tool(name, content));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_stable_tags() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Model.as_str(), "model");
        assert_eq!(Role::Tool.as_str(), "tool");
    }

    #[test]
    fn conversation_preserves_append_order() {
        let mut conversation = Conversation::new();
        conversation.push_system("instructions");
        conversation.push_user("hello");
        conversation.push_model("hi there");
        conversation.push_tool("list_files", "a\nb");

        let roles: Vec<_> = conversation.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Model, Role::Tool]);
        assert_eq!(conversation.len(), 4);
        assert_eq!(
            conversation.turns()[3].tool_name.as_deref(),
            Some("list_files")
        );
    }

    #[test]
    fn only_tool_turns_carry_a_tool_name() {
        let turn = Turn::new(Role::User, "hello");
        assert!(turn.tool_name.is_none());

        let tool_turn = Turn::tool("exec", "done");
        assert_eq!(tool_turn.role, Role::Tool);
        assert_eq!(tool_turn.tool_name.as_deref(), Some("exec"));
    }
}
