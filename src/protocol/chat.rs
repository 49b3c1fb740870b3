use serde::{Deserialize, Serialize};

/// A nested piece of a chat message.
///
/// Style flags are stringified booleans (`"true"`). `bold`, `italic`,
/// `underlined` and `strikethrough` are left out of the JSON when empty, while
/// `obfuscated`, `color` and `insertion` are always written, matching what
/// existing status clients were built against.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatComponent {
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bold: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub italic: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub underlined: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub strikethrough: String,
    #[serde(default)]
    pub obfuscated: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub insertion: String,
}

/// Top-level chat message, the same shape as [`ChatComponent`] plus `extra`.
///
/// `extra` is always present in the JSON: `null` when unset, otherwise the
/// list of nested components.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bold: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub italic: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub underlined: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub strikethrough: String,
    #[serde(default)]
    pub obfuscated: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub insertion: String,
    #[serde(default)]
    pub extra: Option<Vec<ChatComponent>>,
}

impl ChatMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
