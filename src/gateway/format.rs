//! Reply formatting for Telegram's HTML parse mode

use once_cell::sync::Lazy;
use regex::Regex;

/// Telegram's per-message text limit
pub const MAX_MESSAGE_CHARS: usize = 4096;

const CALLOUTS: [&str; 5] = ["Note:", "Important:", "Key point:", "Remember:", "Warning:"];

static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));

/// Escape text for Telegram HTML
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Turn model output into a readable HTML reply.
///
/// The text is escaped, `**bold**` becomes `<b>`, list markers become
/// bullets, call-out headings are bolded on their own line, a leading emoji
/// is chosen by keyword and paragraphs are separated by blank lines.
pub fn format_message(text: &str) -> String {
    let mut body = escape_html(text.trim());

    for callout in CALLOUTS {
        if body.contains(callout) {
            body = body
                .replace(&format!("**{}**", callout), callout)
                .replace(callout, &format!("\n<b>{}</b>\n", callout));
        }
    }

    // after call-outs so bold tags never nest
    body = BOLD.replace_all(&body, "<b>$1</b>").into_owned();

    let lines: Vec<String> = body
        .lines()
        .map(bulletize)
        .filter(|line| !line.is_empty())
        .collect();

    format!("{} {}", leading_emoji(text), lines.join("\n\n"))
}

fn bulletize(line: &str) -> String {
    let trimmed = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return format!("• {}", rest.trim_start());
        }
    }
    trimmed.to_string()
}

fn leading_emoji(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("example") {
        "💡"
    } else if ["error", "warning", "caution"].iter().any(|w| lower.contains(w)) {
        "⚠️"
    } else if ["success", "complete", "done"].iter().any(|w| lower.contains(w)) {
        "✅"
    } else {
        "🤖"
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring
/// line boundaries. Lines longer than the limit are cut outside HTML
/// entities, tags and `<b>` elements where possible.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            let mut rest = &chars[..];
            while rest.len() > max_chars {
                let cut = safe_cut(rest, max_chars);
                chunks.push(rest[..cut].iter().collect());
                rest = &rest[cut..];
            }
            current = rest.iter().collect();
            current_len = rest.len();
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Longest prefix of at most `max_chars` that ends outside an entity, a tag
/// and an open `<b>` element; `max_chars` when no such prefix exists.
fn safe_cut(chars: &[char], max_chars: usize) -> usize {
    let head = &chars[..max_chars];
    let mut cut = max_chars;

    if let Some(amp) = head.iter().rposition(|&c| c == '&') {
        if !head[amp..].contains(&';') {
            cut = amp;
        }
    }
    if let Some(lt) = head[..cut].iter().rposition(|&c| c == '<') {
        if !head[lt..cut].contains(&'>') {
            cut = lt;
        }
    }

    let prefix: String = head[..cut].iter().collect();
    if let Some(open) = prefix.rfind("<b>") {
        if prefix.rfind("</b>").map_or(true, |close| close < open) {
            cut = prefix[..open].chars().count();
        }
    }

    if cut == 0 {
        max_chars
    } else {
        cut
    }
}
