//! HTML and JSON artifact content flattened to plain text lines.

use regex::Regex;

use leadsearch_core::ScrapeArtifact;

/// Strips script/style blocks and tags, decodes entities, and collapses
/// whitespace. Block-level closers become line breaks so line-oriented
/// parsers still see listing boundaries.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let scripts = Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex");
    let styles = Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex");
    let breaks =
        Regex::new(r"(?i)<(?:br|/p|/div|/li|/tr|/h[1-6])[^>]*>").expect("valid break regex");
    let tags = Regex::new(r"(?is)<[^>]+>").expect("valid tags regex");

    let text = scripts.replace_all(html, " ");
    let text = styles.replace_all(&text, " ");
    let text = breaks.replace_all(&text, "\n");
    let text = tags.replace_all(&text, " ");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text view of an artifact: HTML when present, otherwise the string values
/// of the JSON blob, one per line.
#[must_use]
pub fn artifact_text(artifact: &ScrapeArtifact) -> Option<String> {
    if let Some(html) = artifact.html.as_deref() {
        return Some(html_to_text(html));
    }
    let json = artifact.json_blob.as_ref()?;
    let mut lines = Vec::new();
    collect_json_strings(json, &mut lines);
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn collect_json_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for child in map.values() {
                collect_json_strings(child, out);
            }
        }
        _ => {}
    }
}

fn decode_entities(text: &str) -> String {
    let numeric = Regex::new(r"(?i)&#(x?[0-9a-f]+);").expect("valid entity regex");
    let decoded = numeric.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let parsed = code
            .strip_prefix(['x', 'X'])
            .map_or_else(|| code.parse::<u32>().ok(), |hex| u32::from_str_radix(hex, 16).ok());
        parsed
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
