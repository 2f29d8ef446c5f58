use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// Entities decoded by [`decode_entities`]; anything else stays verbatim.
const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
    ("&nbsp;", "\u{00A0}"),
];

/// Removes `<...>` spans such as `<v Speaker>`, `<c.colorE5E5E5>` or inline
/// `<00:00:01.500>` timestamps.
pub(crate) fn strip_markup(line: &str) -> Cow<'_, str> {
    TAG_PATTERN.replace_all(line, "")
}

/// Single left-to-right pass, so `&amp;lt;` decodes to `&lt;` and not `<`.
pub(crate) fn decode_entities(line: &str) -> Cow<'_, str> {
    if !line.contains('&') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES
            .iter()
            .find(|(entity, _)| tail.starts_with(entity))
        {
            Some((entity, replacement)) => {
                out.push_str(replacement);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
