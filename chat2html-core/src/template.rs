const PAGE_TITLE: &str = "Conversation Chat Interface";
const FOOTER_TEXT: &str = "Generated by LM Studio Chat Parser";

const STYLE: &str = r"
        :root {
            --bg: #ffffff;
            --fg: #000000;
            --border: #000000;
            --muted-bg: #f0f0f0;
            --badge-bg: #e0e0e0;
            --user-bg: #000000;
            --user-fg: #ffffff;
            --header-bg: #000000;
            --header-fg: #ffffff;
            --response-bg: #e8f4f8;
            --response-border: #b3e0ff;
            --code-bg: #f5f5f5;
        }

        .dark-mode {
            --bg: #121212;
            --fg: #e6e6e6;
            --border: #3a3a3a;
            --muted-bg: #1e1e1e;
            --badge-bg: #2c2c2c;
            --user-bg: #2f3b52;
            --user-fg: #f0f0f0;
            --header-bg: #1b1b1b;
            --header-fg: #f0f0f0;
            --response-bg: #1a2a33;
            --response-border: #2d5a73;
            --code-bg: #1e1e1e;
        }

        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
        }

        body {
            background-color: var(--bg);
            color: var(--fg);
            min-height: 100vh;
            line-height: 1.6;
            transition: background-color 0.2s, color 0.2s;
        }

        .container {
            width: 100vw;
            height: 100vh;
            overflow: auto;
        }

        .header {
            background-color: var(--header-bg);
            color: var(--header-fg);
            padding: 20px;
            text-align: center;
            border-bottom: 1px solid var(--border);
            position: relative;
        }

        .header h1 {
            font-size: 1.8rem;
            margin-bottom: 10px;
        }

        .conversation-info {
            display: flex;
            justify-content: space-between;
            flex-wrap: wrap;
            gap: 10px;
            font-size: 0.9rem;
        }

        .theme-toggle {
            position: absolute;
            top: 20px;
            right: 20px;
            background: transparent;
            color: var(--header-fg);
            border: 1px solid var(--header-fg);
            border-radius: 4px;
            padding: 4px 10px;
            cursor: pointer;
            font-size: 0.8rem;
        }

        .chat-container {
            padding: 20px;
            width: 100%;
            height: calc(100vh - 150px);
            overflow-y: auto;
        }

        .message {
            margin-bottom: 20px;
            display: flex;
            flex-direction: column;
            align-items: flex-start;
        }

        .message.user {
            align-items: flex-end;
        }

        .message-bubble {
            max-width: 80%;
            padding: 15px;
            border: 1px solid var(--border);
            line-height: 1.5;
            word-wrap: break-word;
        }

        .user .message-bubble {
            background-color: var(--user-bg);
            color: var(--user-fg);
            border-bottom-right-radius: 5px;
        }

        .assistant .message-bubble {
            background-color: var(--bg);
            color: var(--fg);
            border-bottom-left-radius: 5px;
        }

        .message-header {
            display: flex;
            justify-content: space-between;
            align-items: center;
            gap: 12px;
            margin-bottom: 8px;
            font-size: 0.85rem;
        }

        .message-role {
            font-weight: bold;
            text-transform: uppercase;
        }

        .message-timestamp {
            font-size: 0.7rem;
        }

        .message-content h3 {
            margin: 8px 0 4px;
        }

        .message-content ul {
            margin: 6px 0 6px 20px;
        }

        .message-content blockquote {
            border-left: 3px solid var(--border);
            padding-left: 10px;
            margin: 6px 0;
        }

        code {
            font-family: Consolas, 'Courier New', monospace;
            background-color: var(--code-bg);
            padding: 1px 4px;
        }

        pre {
            background-color: var(--code-bg);
            padding: 10px;
            margin: 8px 0;
            overflow-x: auto;
        }

        pre code {
            padding: 0;
        }

        .thinking-process {
            background-color: var(--muted-bg);
            border-left: 4px solid var(--border);
            padding: 12px;
            margin: 10px 0;
            font-size: 0.9rem;
        }

        .thinking-duration {
            background-color: var(--badge-bg);
            padding: 5px 10px;
            border-radius: 12px;
            font-size: 0.8rem;
            margin-top: 5px;
            display: inline-block;
        }

        .stats-section,
        .tool-calls,
        .system-prompt {
            background-color: var(--muted-bg);
            padding: 10px;
            border: 1px solid var(--border);
            margin: 10px 0;
            font-size: 0.8rem;
        }

        .stats-title,
        .system-prompt-title {
            font-weight: bold;
            margin-bottom: 5px;
        }

        .stat-item {
            margin: 3px 0;
        }

        .tool-call-item {
            margin: 5px 0;
        }

        .tool-name {
            font-weight: bold;
        }

        .response-content {
            background-color: var(--response-bg);
            padding: 12px;
            border: 1px solid var(--response-border);
            margin: 10px 0;
            border-radius: 5px;
            font-size: 0.9rem;
        }

        .footer {
            text-align: center;
            padding: 15px;
            background: var(--muted-bg);
            border-top: 1px solid var(--border);
            font-size: 0.8rem;
        }
";

// Stored choice wins; otherwise follow the system color scheme.
const THEME_SCRIPT: &str = r"
        (function () {
            var KEY = 'chat-theme';
            var root = document.documentElement;
            var button = document.getElementById('themeToggle');

            function apply(theme) {
                root.classList.toggle('dark-mode', theme === 'dark');
                if (button) {
                    button.textContent = theme === 'dark' ? 'Light mode' : 'Dark mode';
                }
            }

            var stored = null;
            try { stored = localStorage.getItem(KEY); } catch (e) {}
            var prefersDark = window.matchMedia
                && window.matchMedia('(prefers-color-scheme: dark)').matches;
            apply(stored || (prefersDark ? 'dark' : 'light'));

            if (button) {
                button.addEventListener('click', function () {
                    var next = root.classList.contains('dark-mode') ? 'light' : 'dark';
                    apply(next);
                    try { localStorage.setItem(KEY, next); } catch (e) {}
                });
            }
        })();
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub name: String,
    pub created: String,
    pub token_count: String,
}

pub fn render_page(header: &PageHeader, messages_html: &str, theme_toggle: bool) -> String {
    let toggle_button = if theme_toggle {
        "\n            <button class=\"theme-toggle\" id=\"themeToggle\" type=\"button\">Dark mode</button>"
    } else {
        ""
    };
    let script = if theme_toggle {
        format!("\n    <script>{THEME_SCRIPT}    </script>")
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{PAGE_TITLE}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div class="container">
        <div class="header">{toggle_button}
            <h1>{PAGE_TITLE}</h1>
            <div class="conversation-info">
                <span>Conversation: {name}</span>
                <span>Created: {created}</span>
                <span>Total Tokens: {tokens}</span>
            </div>
        </div>

        <div class="chat-container" id="chatContainer">
{messages_html}
        </div>

        <div class="footer">
            <p>{FOOTER_TEXT}</p>
        </div>
    </div>{script}
</body>
</html>
"#,
        name = header.name,
        created = header.created,
        tokens = header.token_count,
    )
}
