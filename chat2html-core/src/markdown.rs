use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCED_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+)$").expect("valid regex"));
static BOLD_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static BOLD_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(.+?)__").expect("valid regex"));
static ITALIC_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));
static ITALIC_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(.+?)_").expect("valid regex"));
static STRIKETHROUGH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~~(.+?)~~").expect("valid regex"));
static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^>[ \t]+(.+)$").expect("valid regex"));
static CODE_SLOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{1}([0-9]+)\u{1}").expect("valid regex"));

// Fenced block bodies are parked behind this marker so no later pass can
// rewrite them. Markers already in the input are replaced first.
const CODE_SLOT: char = '\u{1}';
const REPLACEMENT: &str = "\u{FFFD}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    Outside,
    InList,
}

pub fn format_content(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Pass order is part of the output; later rules see earlier HTML.
    let text = text.replace(CODE_SLOT, REPLACEMENT);
    let mut code_blocks = Vec::new();
    let text = FENCED_CODE_RE.replace_all(&text, |caps: &Captures<'_>| {
        code_blocks.push(format!("<pre><code>{}</code></pre>", &caps[1]));
        format!("{CODE_SLOT}{}{CODE_SLOT}", code_blocks.len() - 1)
    });

    let text = INLINE_CODE_RE.replace_all(&text, "<code>${1}</code>");
    let text = HEADER_RE.replace_all(&text, "<h3>${1}</h3>");
    let text = BOLD_STAR_RE.replace_all(&text, "<strong>${1}</strong>");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "<strong>${1}</strong>");
    let text = ITALIC_STAR_RE.replace_all(&text, "<em>${1}</em>");
    let text = ITALIC_UNDERSCORE_RE.replace_all(&text, "<em>${1}</em>");
    let text = STRIKETHROUGH_RE.replace_all(&text, "<del>${1}</del>");
    let text = build_lists(&text);
    let text = BLOCKQUOTE_RE.replace_all(&text, "<blockquote>${1}</blockquote>");
    let text = text.replace("\n\n", "</p><p>").replace('\n', "<br>");

    let text = CODE_SLOT_RE.replace_all(&text, |caps: &Captures<'_>| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|idx| code_blocks.get(idx))
            .cloned()
            .unwrap_or_default()
    });

    if text.starts_with('<') {
        text.into_owned()
    } else {
        format!("<p>{text}</p>")
    }
}

fn build_lists(text: &str) -> String {
    let mut lines = Vec::new();
    // A list still open at end of input stays open.
    let _final_state = text.split('\n').fold(ListState::Outside, |state, line| {
        scan_line(state, line, &mut lines)
    });
    lines.join("\n")
}

fn scan_line(state: ListState, line: &str, lines: &mut Vec<String>) -> ListState {
    match (state, list_item(line)) {
        (ListState::Outside, Some(item)) => {
            lines.push(format!("<ul><li>{item}</li>"));
            ListState::InList
        }
        (ListState::InList, Some(item)) => {
            if let Some(open) = lines.last_mut() {
                open.push_str(&format!("<li>{item}</li>"));
            }
            ListState::InList
        }
        (ListState::InList, None) if line.trim().is_empty() => {
            close_list(lines);
            lines.push(line.to_string());
            ListState::Outside
        }
        (ListState::InList, None) => {
            close_list(lines);
            lines.push(format!("<p>{line}</p>"));
            ListState::Outside
        }
        (ListState::Outside, None) => {
            lines.push(line.to_string());
            ListState::Outside
        }
    }
}

fn close_list(lines: &mut [String]) {
    if let Some(open) = lines.last_mut() {
        open.push_str("</ul>");
    }
}

fn list_item(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}
