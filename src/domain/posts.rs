mod data;

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, doc_text, element, html_content::TextType, rewrite_str};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::warn;

use crate::domain::entities::PostRecord;

pub use data::demo_posts;

/// Creation date as shown on cards and in the detail overlay.
pub const DISPLAY_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]. [month padding:zero]. [day padding:zero].");

pub const EXCERPT_MAX_CHARS: usize = 160;

pub fn format_display_date(value: OffsetDateTime) -> String {
    value
        .format(DISPLAY_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

/// Card excerpt: the stored excerpt when present, otherwise derived from content.
pub fn excerpt_for(post: &PostRecord) -> String {
    match post.excerpt.as_deref().map(str::trim) {
        Some(stored) if !stored.is_empty() => stored.to_string(),
        _ => derive_excerpt(&post.content, EXCERPT_MAX_CHARS),
    }
}

/// Strip markup, collapse whitespace and cut at `max_chars` characters.
pub fn derive_excerpt(content: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(&strip_markup(content));
    if text.chars().count() <= max_chars {
        return text;
    }

    let mut cut: String = text.chars().take(max_chars).collect();
    if let Some(boundary) = cut.rfind(' ') {
        cut.truncate(boundary);
    }
    cut.push('…');
    cut
}

/// Visible text of an HTML fragment with entities decoded. Script and style
/// bodies are dropped; every element boundary becomes a space.
fn strip_markup(content: &str) -> String {
    let text = Rc::new(RefCell::new(String::with_capacity(content.len())));

    let rewritten = rewrite_str(
        content,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let text = Rc::clone(&text);
                move |_| {
                    text.borrow_mut().push(' ');
                    Ok(())
                }
            })],
            document_content_handlers: vec![doc_text!({
                let text = Rc::clone(&text);
                move |chunk| {
                    if matches!(chunk.text_type(), TextType::Data) {
                        text.borrow_mut().push_str(chunk.as_str());
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    );
    if let Err(err) = rewritten {
        warn!(error = %err, "post content could not be parsed for an excerpt");
    }

    let raw = text.borrow().clone();
    decode_entities(&raw)
}

/// Decode character references in text content. Unknown named references
/// are kept as written.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 1..];
        let decoded = candidate
            .find(';')
            .filter(|&end| end > 0 && end <= 10)
            .and_then(|end| decode_reference(&candidate[..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "hellip" => '…',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '©',
        _ => return None,
    };
    Some(ch)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
