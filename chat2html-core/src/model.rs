use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const TEXT_PART: &str = "text";
const CONTENT_BLOCK: &str = "contentBlock";
const THINKING_MARKER: &str = "thinking";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub system_prompt: Option<String>,
    pub created_at: Option<Value>,
    pub token_count: Option<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub messages: Option<Vec<Message>>,
}

impl Conversation {
    pub fn messages(&self) -> &[Message] {
        self.messages.as_deref().unwrap_or_default()
    }

    // Zero counts as missing.
    pub fn created_at_millis(&self) -> Option<i64> {
        self.created_at
            .as_ref()
            .and_then(epoch_millis)
            .filter(|millis| *millis != 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient_list")]
    pub versions: Option<Vec<Version>>,
}

impl Message {
    pub fn first_version(&self) -> Option<&Version> {
        self.versions.as_deref().and_then(<[Version]>::first)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Version {
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub preprocessed: Option<Preprocessed>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub content: Option<Vec<ContentPart>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub steps: Option<Vec<Step>>,
    #[serde(
        rename = "tool_calls",
        alias = "toolCalls",
        default,
        deserialize_with = "lenient_list"
    )]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Version {
    pub fn role(&self) -> MessageRole {
        self.role
            .as_deref()
            .map_or_else(|| MessageRole::Other("unknown".to_string()), MessageRole::parse)
    }

    pub fn timestamp_millis(&self) -> Option<i64> {
        self.preprocessed
            .as_ref()
            .and_then(|preprocessed| preprocessed.timestamp.as_ref())
            .and_then(epoch_millis)
    }

    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .flatten()
            .filter_map(ContentPart::text)
            .last()
    }

    pub fn steps(&self) -> &[Step] {
        self.steps.as_deref().unwrap_or_default()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Preprocessed {
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

impl ContentPart {
    pub fn text(&self) -> Option<&str> {
        if self.kind.as_deref() != Some(TEXT_PART) {
            return None;
        }
        self.text.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub content: Option<Vec<ContentPart>>,
    pub style: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub gen_info: Option<GenInfo>,
}

impl Step {
    pub fn is_content_block(&self) -> bool {
        self.kind.as_deref() == Some(CONTENT_BLOCK)
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().flatten().filter_map(ContentPart::text)
    }

    pub fn style_title(&self) -> Option<&str> {
        self.style
            .as_ref()
            .and_then(|style| style.get("title"))
            .and_then(Value::as_str)
    }

    // Matches the style type as well as the title.
    pub fn is_thinking(&self) -> bool {
        let Some(style) = &self.style else {
            return false;
        };
        let text = match style {
            Value::Null => return false,
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        text.to_lowercase().contains(THINKING_MARKER)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenInfo {
    pub stats: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub indexed_model_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub load_model_config: Option<LoadModelConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadModelConfig {
    #[serde(default, deserialize_with = "lenient_list")]
    pub fields: Option<Vec<ConfigField>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigField {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolCall {
    #[serde(default, deserialize_with = "lenient")]
    pub function: Option<FunctionCall>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionCall {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    Other(String),
}

impl MessageRole {
    pub fn parse(role: &str) -> Self {
        match role {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Other(role) => role,
        }
    }

    pub fn label(&self) -> String {
        let mut chars = self.as_str().chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A field of the wrong JSON type reads as absent instead of failing the document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(&value).ok())
}

// Same for lists; malformed items are dropped individually.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|items| items.iter().filter_map(|item| T::deserialize(item).ok()).collect()))
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|millis| millis as i64))
}
