// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plain-text rendering of HTML email bodies.
//!
//! Lossy by nature: markup and styling go, every piece of visible text stays.

/// Tags that start a new line in the text rendering.
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "tr", "li", "ul", "ol", "table", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "blockquote", "section", "header", "footer",
];

/// Elements whose content is never visible.
const HIDDEN_TAGS: &[&str] = &["style", "script", "head", "title"];

/// Strip tags, decode entities and normalise whitespace.
pub fn html_to_text(html: &str) -> String {
    let mut raw = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    let mut hidden: Option<String> = None;

    while let Some(c) = chars.next() {
        match c {
            '<' if opens_tag(chars.peek()) => {
                let tag = read_tag(&mut chars);
                if tag.starts_with("!--") {
                    if !tag.ends_with("--") {
                        skip_comment(&mut chars);
                    }
                    continue;
                }

                let closing = tag.starts_with('/');
                let name = tag_name(&tag);

                if let Some(open) = &hidden {
                    if closing && &name == open {
                        hidden = None;
                    }
                    continue;
                }

                if !closing && !tag.ends_with('/') && HIDDEN_TAGS.contains(&name.as_str()) {
                    hidden = Some(name);
                } else if BLOCK_TAGS.contains(&name.as_str()) {
                    raw.push('\n');
                } else if name == "td" || name == "th" {
                    raw.push(' ');
                }
            }
            _ if hidden.is_some() => {}
            '&' => match read_entity(&mut chars) {
                Some(decoded) => raw.push_str(&decoded),
                None => raw.push('&'),
            },
            _ => raw.push(c),
        }
    }

    normalise_whitespace(&raw)
}

/// A bare `<` followed by anything else is text, as in `< 10`.
fn opens_tag(next: Option<&char>) -> bool {
    matches!(next, Some(c) if c.is_ascii_alphabetic() || *c == '/' || *c == '!')
}

/// Consume up to the closing `>` (quotes may contain `>`). Returns the tag body.
fn read_tag(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut tag = String::new();
    let mut quote: Option<char> = None;
    for t in chars.by_ref() {
        match quote {
            Some(q) if t == q => quote = None,
            Some(_) => {}
            None if t == '"' || t == '\'' => quote = Some(t),
            None if t == '>' => break,
            None => {}
        }
        tag.push(t);
    }
    tag.trim().to_string()
}

fn skip_comment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    let mut dashes = 0;
    for c in chars.by_ref() {
        match c {
            '-' => dashes += 1,
            '>' if dashes >= 2 => return,
            _ => dashes = 0,
        }
    }
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Decode the entity following a `&`. On failure nothing is consumed.
fn read_entity(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut lookahead = chars.clone();
    let mut name = String::new();
    loop {
        match lookahead.next() {
            Some(';') => break,
            Some(c) if (c.is_ascii_alphanumeric() || c == '#') && name.len() < 10 => name.push(c),
            _ => return None,
        }
    }

    let decoded = match name.as_str() {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        "nbsp" => " ".to_string(),
        "copy" => "©".to_string(),
        "mdash" => "—".to_string(),
        "ndash" => "–".to_string(),
        "hellip" => "…".to_string(),
        n if n.starts_with("#x") || n.starts_with("#X") => {
            char::from_u32(u32::from_str_radix(&n[2..], 16).ok()?)?.to_string()
        }
        n if n.starts_with('#') => char::from_u32(n[1..].parse().ok()?)?.to_string(),
        _ => return None,
    };

    // Commit: name plus the terminating ';'
    for _ in 0..=name.chars().count() {
        chars.next();
    }
    Some(decoded)
}

/// Collapse runs of whitespace inside lines and drop blank lines.
fn normalise_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
