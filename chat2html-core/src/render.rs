use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ConvertOptions;
use crate::markdown::format_content;
use crate::model::{ConfigField, Conversation, GenInfo, MessageRole, Step, ToolCall, Version};
use crate::template::{PageHeader, render_page};

static THOUGHT_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Thought for .+ seconds").expect("valid regex"));

const UNKNOWN_CONVERSATION: &str = "Unknown Conversation";
const UNKNOWN_CREATED: &str = "Unknown";
const UNKNOWN_TOOL: &str = "Unknown";
const EMPTY_ARGUMENTS: &str = "{}";

// (stats key, label, unit suffix)
const STAT_ROWS: &[(&str, &str, &str)] = &[
    ("stopReason", "Stop Reason", ""),
    ("tokensPerSecond", "Tokens Per Second", ""),
    ("timeToFirstTokenSec", "Time to First Token", "s"),
    ("totalTimeSec", "Total Time", "s"),
    ("promptTokensCount", "Prompt Tokens", ""),
    ("predictedTokensCount", "Predicted Tokens", ""),
    ("totalTokensCount", "Total Tokens", ""),
];

// (fragment of a loadModelConfig field key, label)
const LOAD_CONFIG_ROWS: &[(&str, &str)] = &[
    ("contextLength", "Context Length"),
    ("kCacheQuantizationType", "K Cache Quantization"),
    ("vCacheQuantizationType", "V Cache Quantization"),
    ("cpuThreadPoolSize", "CPU Threads"),
];

#[derive(Default)]
struct AssistantParts {
    inline: String,
    responses: String,
    stats: String,
}

pub fn render_document(conversation: &Conversation, options: &ConvertOptions) -> String {
    let header = PageHeader {
        name: conversation
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_CONVERSATION.to_string()),
        created: conversation
            .created_at_millis()
            .and_then(|millis| options.time_zone.format_millis(millis))
            .unwrap_or_else(|| UNKNOWN_CREATED.to_string()),
        token_count: conversation
            .token_count
            .as_ref()
            .filter(|count| !count.is_null())
            .map_or_else(|| "0".to_string(), scalar_text),
    };

    render_page(
        &header,
        &render_messages(conversation, options),
        options.theme_toggle,
    )
}

pub fn render_messages(conversation: &Conversation, options: &ConvertOptions) -> String {
    let mut output = String::new();

    if let Some(prompt) = conversation
        .system_prompt
        .as_deref()
        .filter(|prompt| !prompt.is_empty())
    {
        output.push_str("<div class=\"system-prompt\">\n");
        output.push_str("    <div class=\"system-prompt-title\">System Prompt</div>\n");
        output.push_str(&format!("    <div>{}</div>\n", format_content(prompt)));
        output.push_str("</div>\n");
    }

    let mut rendered = 0usize;
    for (idx, message) in conversation.messages().iter().enumerate() {
        let Some(version) = message.first_version() else {
            warn!(index = idx, "skipping message without versions");
            continue;
        };
        render_message(&mut output, version, options);
        rendered += 1;
    }

    debug!(
        messages = rendered,
        total = conversation.messages().len(),
        "rendered conversation messages"
    );
    output
}

fn render_message(output: &mut String, version: &Version, options: &ConvertOptions) {
    let role = version.role();
    let timestamp = version
        .timestamp_millis()
        .and_then(|millis| options.time_zone.format_millis(millis));

    output.push_str(&format!("<div class=\"message {role}\">\n"));
    output.push_str("    <div class=\"message-bubble\">\n");
    output.push_str("        <div class=\"message-header\">\n");
    output.push_str(&format!(
        "            <span class=\"message-role\">{}</span>\n",
        role.label()
    ));
    if let Some(timestamp) = timestamp {
        output.push_str(&format!(
            "            <span class=\"message-timestamp\">{timestamp}</span>\n"
        ));
    }
    output.push_str("        </div>\n");
    output.push_str(&format!(
        "        <div class=\"message-content\">{}</div>\n",
        format_content(version.text().unwrap_or_default())
    ));

    if role == MessageRole::Assistant && version.steps.is_some() {
        let parts = scan_steps(version.steps());
        output.push_str(&parts.inline);
        output.push_str(&parts.responses);
        output.push_str(&parts.stats);
        output.push_str(&render_tool_calls(version.tool_calls()));
    }

    output.push_str("    </div>\n");
    output.push_str("</div>\n");
}

fn scan_steps(steps: &[Step]) -> AssistantParts {
    let mut parts = AssistantParts::default();

    for step in steps {
        if step.is_content_block() {
            let thinking = step.is_thinking();
            for text in step.texts() {
                let formatted = format_content(text);
                if thinking {
                    parts.inline.push_str(&format!(
                        "        <div class=\"thinking-process\"><strong>Thinking Process:</strong><br>{formatted}</div>\n"
                    ));
                } else {
                    parts.responses.push_str(&format!(
                        "        <div class=\"response-content\"><strong>Model Response:</strong><br>{formatted}</div>\n"
                    ));
                }
            }
        }

        if let Some(title) = step
            .style_title()
            .filter(|title| THOUGHT_DURATION_RE.is_match(title))
        {
            parts.inline.push_str(&format!(
                "        <div class=\"thinking-duration\">{title}</div>\n"
            ));
        }

        if let Some(section) = step.gen_info.as_ref().and_then(render_stats) {
            parts.stats.push_str(&section);
        }
    }

    parts
}

fn render_stats(info: &GenInfo) -> Option<String> {
    let stats = info
        .stats
        .as_ref()
        .and_then(Value::as_object)
        .filter(|stats| !stats.is_empty())?;

    let mut items = Vec::new();
    for (key, label, suffix) in STAT_ROWS {
        if let Some(value) = stats.get(*key) {
            items.push(format!("{label}: {}{suffix}", scalar_text(value)));
        }
    }

    if let Some(model) = info.indexed_model_identifier.as_deref().and_then(model_name) {
        items.push(format!("Model: {model}"));
    }

    let fields = info
        .load_model_config
        .as_ref()
        .and_then(|config| config.fields.as_deref())
        .unwrap_or_default();
    for (fragment, label) in LOAD_CONFIG_ROWS {
        if let Some(value) = load_config_value(fields, fragment) {
            items.push(format!("{label}: {value}"));
        }
    }

    items.extend(derived_ratios(stats));

    let mut section = String::new();
    section.push_str("        <div class=\"stats-section\">\n");
    section.push_str("            <div class=\"stats-title\">Model Generation Statistics</div>\n");
    for item in items {
        section.push_str(&format!("            <div class=\"stat-item\">{item}</div>\n"));
    }
    section.push_str("        </div>\n");
    Some(section)
}

// Ratios need a non-zero prompt count and a non-zero denominator of their own.
fn derived_ratios(stats: &Map<String, Value>) -> Vec<String> {
    let number = |key: &str| stats.get(key).and_then(Value::as_f64);
    let non_zero = |value: &f64| value.abs() > f64::EPSILON;

    let Some(prompt) = number("promptTokensCount").filter(non_zero) else {
        return Vec::new();
    };
    let predicted = number("predictedTokensCount");
    let total = number("totalTokensCount");
    let total_time = number("totalTimeSec").filter(non_zero);

    let mut items = Vec::new();
    if let Some(predicted) = predicted {
        items.push(format!("Output/Prompt Ratio: {:.2}", predicted / prompt));
    }
    if let (Some(predicted), Some(total)) = (predicted, total.filter(non_zero)) {
        items.push(format!("Output Share: {:.1}%", predicted / total * 100.0));
    }
    if let (Some(total), Some(total_time)) = (total, total_time) {
        items.push(format!(
            "Effective Throughput: {:.2} tokens/s",
            total / total_time
        ));
    }
    items
}

fn model_name(identifier: &str) -> Option<String> {
    let file = identifier.rsplit('/').next()?;
    let name = file.strip_suffix(".gguf").unwrap_or(file);
    (!name.is_empty()).then(|| name.to_string())
}

fn load_config_value(fields: &[ConfigField], fragment: &str) -> Option<String> {
    let value = fields
        .iter()
        .find(|field| field.key.as_deref().is_some_and(|key| key.contains(fragment)))?
        .value
        .as_ref()?;

    // Some fields are wrapped as {"checked": bool, "value": ...}.
    let value = match value.get("checked").and_then(Value::as_bool) {
        Some(false) => return None,
        Some(true) => value.get("value")?,
        None => value,
    };

    (!value.is_null()).then(|| scalar_text(value))
}

fn render_tool_calls(tool_calls: &[ToolCall]) -> String {
    if tool_calls.is_empty() {
        return String::new();
    }

    let mut output = String::new();
    output.push_str("        <div class=\"tool-calls\">\n");
    output.push_str(
        "            <div class=\"tool-call-item\"><strong>Tool Calls:</strong></div>\n",
    );
    for tool_call in tool_calls {
        let function = tool_call.function.as_ref();
        let name = function
            .and_then(|function| function.name.as_deref())
            .unwrap_or(UNKNOWN_TOOL);
        let arguments = function
            .and_then(|function| function.arguments.as_ref())
            .filter(|arguments| !arguments.is_null())
            .map_or_else(|| EMPTY_ARGUMENTS.to_string(), scalar_text);
        output.push_str(&format!(
            "            <div class=\"tool-call-item\"><span class=\"tool-name\">{name}</span>: {arguments}</div>\n"
        ));
    }
    output.push_str("        </div>\n");
    output
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::config::{ConvertOptions, TimeZoneMode};
    use crate::model::Conversation;
    use crate::render::{render_document, render_messages};

    fn options() -> ConvertOptions {
        ConvertOptions {
            time_zone: TimeZoneMode::Utc,
            theme_toggle: true,
        }
    }

    fn conversation(value: Value) -> Conversation {
        serde_json::from_value(value).expect("deserialize conversation")
    }

    fn assistant_with_steps(steps: Value) -> Conversation {
        conversation(json!({
            "messages": [{"versions": [{"role": "assistant", "type": "multiStep", "steps": steps}]}]
        }))
    }

    #[test]
    fn one_block_per_message_with_versions() {
        let conversation = conversation(json!({
            "messages": [
                {"versions": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]},
                {"versions": []},
                {},
                {"versions": [{"role": "assistant", "content": []}]}
            ]
        }));

        let html = render_messages(&conversation, &options());
        assert_eq!(html.matches("<div class=\"message ").count(), 2);
        assert!(html.contains("<div class=\"message user\">"));
        assert!(html.contains("<span class=\"message-role\">User</span>"));
        assert!(html.contains("<span class=\"message-role\">Assistant</span>"));
    }

    #[test]
    fn timestamp_rendered_only_when_present() {
        let conversation = conversation(json!({
            "messages": [
                {"versions": [{"role": "user", "preprocessed": {"timestamp": 1_700_000_000_000_i64}}]},
                {"versions": [{"role": "user"}]}
            ]
        }));

        let html = render_messages(&conversation, &options());
        assert_eq!(html.matches("message-timestamp").count(), 1);
        assert!(html.contains("<span class=\"message-timestamp\">2023-11-14 22:13:20</span>"));
    }

    #[test]
    fn body_uses_last_text_part_formatted() {
        let conversation = conversation(json!({
            "messages": [{"versions": [{"role": "user", "content": [
                {"type": "text", "text": "first"},
                {"type": "text", "text": "**second**"}
            ]}]}]
        }));

        let html = render_messages(&conversation, &options());
        assert!(html.contains("<div class=\"message-content\"><strong>second</strong></div>"));
        assert!(!html.contains("first"));
    }

    #[test]
    fn missing_system_prompt_emits_nothing() {
        let html = render_messages(&conversation(json!({"messages": []})), &options());
        assert!(!html.contains("system-prompt"));

        let html = render_messages(&conversation(json!({"systemPrompt": ""})), &options());
        assert!(!html.contains("system-prompt"));

        let html = render_messages(
            &conversation(json!({"systemPrompt": "Be brief."})),
            &options(),
        );
        assert!(html.contains("<div class=\"system-prompt-title\">System Prompt</div>"));
        assert!(html.contains("<p>Be brief.</p>"));
    }

    #[test]
    fn assistant_sections_follow_fixed_order() {
        let conversation = conversation(json!({
            "messages": [{"versions": [{
                "role": "assistant",
                "steps": [
                    {"type": "contentBlock", "content": [{"type": "text", "text": "answer"}],
                     "genInfo": {"stats": {"stopReason": "eosFound"}}},
                    {"type": "contentBlock", "style": {"type": "thinking", "title": "Thought for 1.50 seconds"},
                     "content": [{"type": "text", "text": "pondering"}]}
                ],
                "tool_calls": [{"function": {"name": "search", "arguments": {"q": "rust"}}}]
            }]}]
        }));

        let html = render_messages(&conversation, &options());
        let thinking = html.find("thinking-process").expect("thinking");
        let duration = html.find("thinking-duration").expect("duration");
        let response = html.find("response-content").expect("response");
        let stats = html.find("stats-section").expect("stats");
        let tools = html.find("tool-calls").expect("tools");

        assert!(thinking < duration);
        assert!(duration < response);
        assert!(response < stats);
        assert!(stats < tools);
        assert!(html.contains("<p>pondering</p>"));
        assert!(html.contains("Stop Reason: eosFound"));
        assert!(html.contains("<span class=\"tool-name\">search</span>: {\"q\":\"rust\"}"));
    }

    #[test]
    fn thinking_text_is_not_repeated_as_response() {
        let html = render_messages(
            &assistant_with_steps(json!([
                {"type": "contentBlock", "style": {"title": "Thinking"},
                 "content": [{"type": "text", "text": "inner"}]}
            ])),
            &options(),
        );

        assert_eq!(html.matches("inner").count(), 1);
        assert!(!html.contains("response-content"));
    }

    #[test]
    fn user_messages_ignore_steps() {
        let conversation = conversation(json!({
            "messages": [{"versions": [{
                "role": "user",
                "steps": [{"type": "contentBlock", "content": [{"type": "text", "text": "hidden"}]}]
            }]}]
        }));

        let html = render_messages(&conversation, &options());
        assert!(!html.contains("hidden"));
    }

    #[test]
    fn stats_rows_are_present_key_conditional() {
        let html = render_messages(
            &assistant_with_steps(json!([{
                "type": "contentBlock",
                "genInfo": {"stats": {
                    "tokensPerSecond": 41.5,
                    "timeToFirstTokenSec": 0.25,
                    "promptTokensCount": 100,
                    "predictedTokensCount": 50,
                    "totalTokensCount": 150,
                    "totalTimeSec": 3
                }}
            }])),
            &options(),
        );

        assert!(html.contains("Tokens Per Second: 41.5"));
        assert!(html.contains("Time to First Token: 0.25s"));
        assert!(html.contains("Total Time: 3s"));
        assert!(html.contains("Prompt Tokens: 100"));
        assert!(!html.contains("Stop Reason"));
        assert!(html.contains("Output/Prompt Ratio: 0.50"));
        assert!(html.contains("Output Share: 33.3%"));
        assert!(html.contains("Effective Throughput: 50.00 tokens/s"));
    }

    #[test]
    fn zero_prompt_tokens_skip_derived_rows() {
        let html = render_messages(
            &assistant_with_steps(json!([{
                "type": "contentBlock",
                "genInfo": {"stats": {
                    "promptTokensCount": 0,
                    "predictedTokensCount": 50,
                    "totalTokensCount": 50,
                    "totalTimeSec": 2
                }}
            }])),
            &options(),
        );

        assert!(html.contains("Prompt Tokens: 0"));
        assert!(!html.contains("Ratio"));
        assert!(!html.contains("Output Share"));
        assert!(!html.contains("Effective Throughput"));
    }

    #[test]
    fn zero_numerators_still_render_ratios() {
        let html = render_messages(
            &assistant_with_steps(json!([{
                "type": "contentBlock",
                "genInfo": {"stats": {
                    "promptTokensCount": 100,
                    "predictedTokensCount": 0,
                    "totalTokensCount": 100,
                    "totalTimeSec": 2
                }}
            }])),
            &options(),
        );

        assert!(html.contains("Output/Prompt Ratio: 0.00"));
        assert!(html.contains("Output Share: 0.0%"));
        assert!(html.contains("Effective Throughput: 50.00 tokens/s"));
    }

    #[test]
    fn zero_denominators_skip_their_ratio() {
        let html = render_messages(
            &assistant_with_steps(json!([{
                "type": "contentBlock",
                "genInfo": {"stats": {
                    "promptTokensCount": 10,
                    "predictedTokensCount": 5,
                    "totalTokensCount": 0,
                    "totalTimeSec": 0
                }}
            }])),
            &options(),
        );

        assert!(html.contains("Output/Prompt Ratio: 0.50"));
        assert!(!html.contains("Output Share"));
        assert!(!html.contains("Effective Throughput"));
    }

    #[test]
    fn empty_stats_emit_no_section() {
        let html = render_messages(
            &assistant_with_steps(json!([{"type": "contentBlock", "genInfo": {"stats": {}}}])),
            &options(),
        );
        assert!(!html.contains("stats-section"));
    }

    #[test]
    fn model_details_come_from_gen_info() {
        let html = render_messages(
            &assistant_with_steps(json!([{
                "type": "contentBlock",
                "genInfo": {
                    "stats": {"stopReason": "eosFound"},
                    "indexedModelIdentifier": "lmstudio-community/Qwen2.5-7B-Instruct-GGUF/Qwen2.5-7B-Instruct-Q4_K_M.gguf",
                    "loadModelConfig": {"fields": [
                        {"key": "llm.load.contextLength", "value": 8192},
                        {"key": "llm.load.llama.kCacheQuantizationType", "value": {"checked": true, "value": "q8_0"}},
                        {"key": "llm.load.llama.vCacheQuantizationType", "value": {"checked": false, "value": "f16"}},
                        {"key": "llm.load.llama.cpuThreadPoolSize", "value": 6}
                    ]}
                }
            }])),
            &options(),
        );

        assert!(html.contains("Model: Qwen2.5-7B-Instruct-Q4_K_M"));
        assert!(html.contains("Context Length: 8192"));
        assert!(html.contains("K Cache Quantization: q8_0"));
        assert!(!html.contains("V Cache Quantization"));
        assert!(html.contains("CPU Threads: 6"));
    }

    #[test]
    fn tool_call_with_empty_arguments_still_renders() {
        let conversation = conversation(json!({
            "messages": [{"versions": [{
                "role": "assistant",
                "steps": [],
                "tool_calls": [
                    {"function": {"name": "noop", "arguments": {}}},
                    {"function": {"arguments": "{\"path\":\"/tmp\"}"}},
                    {}
                ]
            }]}]
        }));

        let html = render_messages(&conversation, &options());
        assert!(html.contains(
            "<div class=\"tool-call-item\"><span class=\"tool-name\">noop</span>: {}</div>"
        ));
        assert!(html.contains("<span class=\"tool-name\">Unknown</span>: {\"path\":\"/tmp\"}"));
        assert!(html.contains("<span class=\"tool-name\">Unknown</span>: {}"));
    }

    #[test]
    fn document_header_defaults() {
        let html = render_document(&conversation(json!({})), &options());
        assert!(html.contains("Conversation: Unknown Conversation"));
        assert!(html.contains("Created: Unknown"));
        assert!(html.contains("Total Tokens: 0"));
    }

    #[test]
    fn document_header_values() {
        let html = render_document(
            &conversation(json!({
                "name": "Rust questions",
                "createdAt": 1_700_000_000_000_i64,
                "tokenCount": 1234
            })),
            &options(),
        );
        assert!(html.contains("Conversation: Rust questions"));
        assert!(html.contains("Created: 2023-11-14 22:13:20"));
        assert!(html.contains("Total Tokens: 1234"));
    }
}
