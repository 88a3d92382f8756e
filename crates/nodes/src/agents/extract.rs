//! Pulling code, prose, and dependency lists out of a model reply.

const PYTHON_FENCE: &str = "```python\n";
const BARE_FENCE: &str = "```\n";
const FENCE: &str = "```";

/// The first fenced `python` block, falling back to the first bare block.
pub(crate) fn extract_code(reply: &str) -> Option<String> {
    fenced_body(reply, PYTHON_FENCE)
        .or_else(|| fenced_body(reply, BARE_FENCE))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

fn fenced_body<'a>(reply: &'a str, opening: &str) -> Option<&'a str> {
    let start = reply.find(opening)? + opening.len();
    let len = reply[start..].find(FENCE)?;
    Some(&reply[start..start + len])
}

/// The `## Explanation` section, or all prose outside code blocks.
pub(crate) fn extract_explanation(reply: &str) -> Option<String> {
    let prose = strip_code_blocks(reply);
    let text = match prose.split_once("## Explanation") {
        Some((_, rest)) => rest.split("##").next().unwrap_or_default(),
        None => prose.as_str(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn strip_code_blocks(reply: &str) -> String {
    let mut out = String::with_capacity(reply.len());
    let mut rest = reply;
    while let Some(open) = rest.find(FENCE) {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + FENCE.len()..];
        match after_open.find(FENCE) {
            Some(close) => rest = &after_open[close + FENCE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Entries of the `## Dependencies` list, skipping "None" and "No ..." lines.
pub(crate) fn extract_dependencies(reply: &str) -> Vec<String> {
    let Some((_, rest)) = reply.split_once("## Dependencies") else {
        return Vec::new();
    };
    let section = rest.split("##").next().unwrap_or_default();
    section
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| !line.is_empty() && !line.starts_with("None") && !line.starts_with("No "))
        .map(str::to_string)
        .collect()
}
