//! Shared helpers: Notion id extraction, name sanitizing, lenient date
//! parsing, hashtag escaping and front matter serialization.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

use crate::notion::types::PropertyValue;

/// Notion ids come at the end of file names and URL paths and are always
/// 32 hex characters once hyphens are removed.
fn notion_id_regex() -> Regex {
    Regex::new(r"([a-f0-9]{32})(\?|\.|$)").unwrap()
}

/// Extract the Notion id from a file name or URL path.
/// `"Page Name abc...123.html"` -> `Some("abc...123")`
pub fn get_notion_id(value: &str) -> Option<String> {
    let squashed = value.replace('-', "");
    notion_id_regex()
        .captures(&squashed)
        .map(|caps| caps[1].to_string())
}

/// Remove the trailing Notion id from a name.
/// `"Page Name abc...123.html"` -> `"Page Name.html"`
pub fn strip_notion_id(value: &str) -> String {
    let squashed = value.replace('-', "");
    Regex::new(r" ?[a-f0-9]{32}(\.|$)")
        .unwrap()
        .replace(&squashed, "$1")
        .to_string()
}

/// Notion ids of every ancestor folder in an archive path, outermost first.
pub fn parse_parent_ids(archive_path: &str) -> Vec<String> {
    let parent = match archive_path.rfind('/') {
        Some(pos) => &archive_path[..pos],
        None => return Vec::new(),
    };
    parent.split('/').filter_map(get_notion_id).collect()
}

/// Strip leading `../` traversal segments from a relative link target.
pub fn strip_parent_directories(target: &str) -> &str {
    let mut rest = target;
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
    }
    rest
}

/// Make a name safe as a destination file name: drops characters that are
/// illegal on common filesystems, control characters, Windows reserved
/// names, trailing dots/spaces, a leading dot, and characters that break
/// wiki links (`[ ] # | ^`).
pub fn sanitize_file_name(name: &str) -> String {
    let illegal = Regex::new(r#"[/\?<>\\:\*\|"]"#).unwrap();
    let control = Regex::new(r"[\x00-\x1f\x80-\x9f]").unwrap();
    let reserved = Regex::new(r"^\.+$").unwrap();
    let windows_reserved = Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").unwrap();
    let windows_trailing = Regex::new(r"[\. ]+$").unwrap();
    let starts_with_dot = Regex::new(r"^\.").unwrap();
    let bad_link = Regex::new(r"[\[\]#\|\^]").unwrap();

    let name = illegal.replace_all(name, "");
    let name = control.replace_all(&name, "");
    let name = reserved.replace_all(&name, "");
    let name = windows_reserved.replace_all(&name, "");
    let name = windows_trailing.replace_all(&name, "");
    let name = starts_with_dot.replace_all(&name, "");
    bad_link.replace_all(&name, "").to_string()
}

/// Bounded title truncation: titles of at most 200 characters pass through
/// unchanged, longer ones are cut at the last word boundary that fits and
/// suffixed with an ellipsis.
pub fn strip_to_200(title: &str) -> String {
    if title.chars().count() <= 200 {
        return title.to_string();
    }

    let mut kept = String::new();
    for word in title.split(' ') {
        let word_len = word.chars().count();
        let added = if kept.is_empty() { word_len } else { word_len + 1 };
        if kept.chars().count() + added > 200 {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
    }
    kept.push_str("...");
    kept
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y"];

/// Lenient parse of Notion date text. A leading `@` is stripped; anything
/// unparsable yields `None` rather than an error.
pub fn parse_notion_date(text: &str) -> Option<NaiveDateTime> {
    let cleaned = text.trim().trim_start_matches('@').trim();
    if cleaned.is_empty() {
        return None;
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(cleaned, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Whether a timestamp carries only a date: midnight with zero sub-second
/// fields.
pub fn timestamp_is_pure_date(timestamp: &NaiveDateTime) -> bool {
    timestamp.hour() == 0
        && timestamp.minute() == 0
        && timestamp.second() == 0
        && timestamp.nanosecond() == 0
}

/// Escape `#word` tokens so the destination doesn't read them as tags.
/// Tokens already inside a wiki link, a markdown link, or escaped are left
/// alone.
pub fn escape_hashtags(body: &str) -> String {
    let tag_exp = Regex::new(r"(?i)#[a-z0-9\-]+").unwrap();
    if !tag_exp.is_match(body) {
        return body.to_string();
    }

    let lines: Vec<String> = body
        .split('\n')
        .map(|line| {
            let hashtags: Vec<String> = tag_exp
                .find_iter(line)
                .map(|m| m.as_str().to_string())
                .collect();
            let mut new_line = line.to_string();
            for hashtag in hashtags {
                let escaped = regex::escape(&hashtag);
                let hashtag_in_link = Regex::new(&format!(
                    r"\[\[[^\]]*{escaped}[^\]]*\]\]|\[[^\]]*{escaped}[^\]]*\]\([^\)]*\)|\[[^\]]*\]\([^\)]*{escaped}[^\)]*\)|\\{escaped}"
                ))
                .unwrap();
                if hashtag_in_link.is_match(&new_line) {
                    continue;
                }
                new_line = new_line.replacen(&hashtag, &format!("\\{hashtag}"), 1);
            }
            new_line
        })
        .collect();
    lines.join("\n")
}

/// Serialize front matter as a YAML block. Empty input yields an empty
/// string so bodies without properties stay untouched.
pub fn serialize_front_matter(properties: &[(String, PropertyValue)]) -> String {
    if properties.is_empty() {
        return String::new();
    }

    let mut mapping = serde_yaml::Mapping::new();
    for (key, value) in properties {
        let yaml_value = match value {
            PropertyValue::Bool(b) => serde_yaml::Value::Bool(*b),
            PropertyValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serde_yaml::Value::Number((*n as i64).into())
            }
            PropertyValue::Number(n) => serde_yaml::Value::Number((*n).into()),
            PropertyValue::Text(s) => serde_yaml::Value::String(s.clone()),
            PropertyValue::List(items) => serde_yaml::Value::Sequence(
                items
                    .iter()
                    .map(|item| serde_yaml::Value::String(item.clone()))
                    .collect(),
            ),
        };
        mapping.insert(serde_yaml::Value::String(key.clone()), yaml_value);
    }

    match serde_yaml::to_string(&mapping) {
        Ok(yaml) => format!("---\n{yaml}---\n"),
        Err(e) => {
            log::warn!("failed to serialize front matter: {e}");
            String::new()
        }
    }
}
