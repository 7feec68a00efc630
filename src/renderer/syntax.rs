//! Source-level rewrites for Twig forms the engine spells differently.
//!
//! - `{% elseif %}` becomes `{% elif %}`
//! - `for` loops iterate the values of a mapping, and `for k, v in ...`
//!   yields key/value (or index/item) pairs
//! - the inclusive range operator `a..b` becomes a range function call
//!
//! Only tag bodies are rewritten. Template text, comments, string literals
//! and `{% raw %}` sections are copied unchanged, and no newlines are added
//! or removed, so engine line numbers still match the source.

use std::borrow::Cow;

use super::filters::{ITEMS_FILTER, RANGE_FUNCTION, VALUES_FILTER};
use super::{RenderError, RenderErrorKind};

const BLOCK_OPEN: &str = "{%";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Block,
    Expression,
    Comment,
}

impl TagKind {
    fn open(self) -> &'static str {
        match self {
            TagKind::Block => "{%",
            TagKind::Expression => "{{",
            TagKind::Comment => "{#",
        }
    }

    fn close(self) -> &'static str {
        match self {
            TagKind::Block => "%}",
            TagKind::Expression => "}}",
            TagKind::Comment => "#}",
        }
    }
}

pub(super) fn normalize(source: &str) -> Result<Cow<'_, str>, RenderError> {
    if !source.contains(BLOCK_OPEN) && !source.contains("..") {
        return Ok(Cow::Borrowed(source));
    }

    let mut out = String::with_capacity(source.len() + 32);
    let mut pos = 0;

    while let Some((start, kind)) = next_tag(source, pos) {
        out.push_str(&source[pos..start]);

        let body_start = start + 2;
        let Some(body_end) = find_close(source, body_start, kind) else {
            // unterminated tag, left for the engine to report
            out.push_str(&source[start..]);
            pos = source.len();
            break;
        };
        let body = &source[body_start..body_end];
        let line = line_of(source, start);

        out.push_str(kind.open());
        match kind {
            TagKind::Comment => out.push_str(body),
            TagKind::Expression => out.push_str(&rewrite_ranges(body, line)?),
            TagKind::Block => out.push_str(&rewrite_block(body, line)?),
        }
        out.push_str(kind.close());
        pos = body_end + kind.close().len();

        if kind == TagKind::Block && keyword(body) == "raw" {
            if let Some(end) = find_endraw(source, pos) {
                out.push_str(&source[pos..end]);
                pos = end;
            }
        }
    }
    out.push_str(&source[pos..]);

    if out == source {
        Ok(Cow::Borrowed(source))
    } else {
        Ok(Cow::Owned(out))
    }
}

fn rewrite_block(body: &str, line: usize) -> Result<String, RenderError> {
    let (lead, core, trail) = split_markers(body);

    let core = match keyword(core) {
        "elseif" => format!("elif{}", &core["elseif".len()..]),
        "for" => rewrite_for(core),
        _ => core.to_string(),
    };

    Ok(format!("{}{}{}", lead, rewrite_ranges(&core, line)?, trail))
}

/// `for x in E` -> `for x in (E)|values`, `for k, v in E` -> `for k, v in (E)|items`
fn rewrite_for(core: &str) -> String {
    let Some(in_at) = find_unquoted(core, " in ", true) else {
        return core.to_string();
    };
    let targets = &core["for".len()..in_at];
    let tail = &core[in_at + " in ".len()..];

    let expr_end = [" if ", " recursive"]
        .iter()
        .filter_map(|clause| find_unquoted(tail, clause, true))
        .min()
        .unwrap_or(tail.len());
    let (expr, rest) = tail.split_at(expr_end);

    let filter = if targets.contains(',') {
        ITEMS_FILTER
    } else {
        VALUES_FILTER
    };
    format!("for{} in ({})|{}{}", targets, expr.trim(), filter, rest)
}

/// Replace every `a..b` with an inclusive range call.
///
/// Bounds must be number, string or variable operands; anything else is a
/// syntax error rather than a silent misparse.
fn rewrite_ranges(expr: &str, line: usize) -> Result<String, RenderError> {
    let Some(at) = find_unquoted(expr, "..", false) else {
        return Ok(expr.to_string());
    };

    let (left_start, left) = left_operand(&expr[..at]);
    let (right, right_len) = right_operand(&expr[at + 2..]);
    if left.is_empty() || right.is_empty() {
        return Err(range_error(line));
    }

    let before = expr[..left_start].trim_end();
    let after = expr[at + 2 + right_len..].trim_start();
    let binary = |c: char| matches!(c, '+' | '-' | '*' | '/' | '%' | '~');
    if before.ends_with(binary) || after.starts_with(binary) {
        return Err(range_error(line));
    }

    let rest = rewrite_ranges(&expr[at + 2 + right_len..], line)?;
    Ok(format!(
        "{}{}({}, {}){}",
        &expr[..left_start],
        RANGE_FUNCTION,
        left,
        right,
        rest
    ))
}

fn range_error(line: usize) -> RenderError {
    RenderError {
        kind: RenderErrorKind::Syntax,
        message: "syntax error: range bounds must be numbers, strings or variables".to_string(),
        line: Some(line),
    }
}

/// Operand ending `s`, as (start offset, operand)
fn left_operand(s: &str) -> (usize, &str) {
    let head = s.trim_end();
    let end = head.len();

    let start = if let Some(quote) = head.chars().last().filter(|c| matches!(c, '\'' | '"')) {
        match head[..end - 1].rfind(quote) {
            Some(i) => i,
            None => return (end, ""),
        }
    } else {
        let mut start = head
            .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            .len();
        // unary minus directly attached to a number
        if head[..start].ends_with('-')
            && head[start..].starts_with(|c: char| c.is_ascii_digit())
            && head[..start - 1]
                .chars()
                .last()
                .map_or(true, |c| c.is_whitespace() || matches!(c, '(' | '[' | ','))
        {
            start -= 1;
        }
        start
    };

    let operand = &head[start..];
    if is_operand(operand) {
        (start, operand)
    } else {
        (start, "")
    }
}

/// Operand starting `s`, as (operand, bytes consumed)
fn right_operand(s: &str) -> (&str, usize) {
    let skipped = s.len() - s.trim_start().len();
    let body = &s[skipped..];

    let len = if let Some(quote) = body.chars().next().filter(|c| matches!(c, '\'' | '"')) {
        match body[1..].find(quote) {
            Some(i) => i + 2,
            None => return ("", 0),
        }
    } else {
        let mut len = usize::from(body.starts_with('-'));
        let bytes = body.as_bytes();
        while len < bytes.len() {
            let c = bytes[len];
            let dot = c == b'.' && bytes.get(len + 1) != Some(&b'.');
            if c.is_ascii_alphanumeric() || c == b'_' || dot {
                len += 1;
            } else {
                break;
            }
        }
        len
    };

    let operand = &body[..len];
    if is_operand(operand) {
        (operand, skipped + len)
    } else {
        ("", 0)
    }
}

fn is_operand(s: &str) -> bool {
    if s.len() >= 2 && (s.starts_with('\'') || s.starts_with('"')) {
        return true;
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    !s.is_empty()
        && s.split('.').all(|part| {
            part.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Split whitespace-control markers and padding off a block tag body
fn split_markers(body: &str) -> (&str, &str, &str) {
    let lead_len = body
        .char_indices()
        .find(|&(i, c)| !(c.is_whitespace() || (i == 0 && matches!(c, '-' | '+' | '~'))))
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let rest = &body[lead_len..];

    let without_marker = rest
        .strip_suffix(|c: char| matches!(c, '-' | '+' | '~'))
        .unwrap_or(rest);
    let core_len = without_marker.trim_end().len();

    (&body[..lead_len], &rest[..core_len], &rest[core_len..])
}

/// Statement keyword of a block tag body
fn keyword(body: &str) -> &str {
    let trimmed = body
        .trim_start_matches(|c: char| matches!(c, '-' | '+' | '~'))
        .trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

fn next_tag(source: &str, from: usize) -> Option<(usize, TagKind)> {
    let bytes = source.as_bytes();
    let mut at = from;

    while let Some(offset) = source[at..].find('{') {
        let start = at + offset;
        match bytes.get(start + 1) {
            Some(b'%') => return Some((start, TagKind::Block)),
            Some(b'{') => return Some((start, TagKind::Expression)),
            Some(b'#') => return Some((start, TagKind::Comment)),
            _ => at = start + 1,
        }
    }
    None
}

fn find_close(source: &str, from: usize, kind: TagKind) -> Option<usize> {
    if kind == TagKind::Comment {
        return source[from..].find(kind.close()).map(|i| from + i);
    }
    find_unquoted(&source[from..], kind.close(), false).map(|i| from + i)
}

fn find_endraw(source: &str, from: usize) -> Option<usize> {
    let mut at = from;
    while let Some(offset) = source[at..].find(BLOCK_OPEN) {
        let start = at + offset;
        if keyword(&source[start + BLOCK_OPEN.len()..]) == "endraw" {
            return Some(start);
        }
        at = start + BLOCK_OPEN.len();
    }
    None
}

/// Byte offset of `needle` outside string literals, optionally also outside
/// brackets
fn find_unquoted(s: &str, needle: &str, top_level: bool) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if (!top_level || depth == 0) && s[i..].starts_with(needle) {
            return Some(i);
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(source: &str) -> String {
        normalize(source).unwrap().into_owned()
    }

    #[test]
    fn test_rewrites_elseif_keyword() {
        assert_eq!(
            norm("{% if a %}1{% elseif b %}2{% endif %}"),
            "{% if a %}1{% elif b %}2{% endif %}"
        );
    }

    #[test]
    fn test_respects_whitespace_control() {
        assert_eq!(norm("{%- elseif b -%}"), "{%- elif b -%}");
        assert_eq!(norm("{%+  elseif b %}"), "{%+  elif b %}");
    }

    #[test]
    fn test_leaves_text_untouched() {
        let source = "<p>elseif is a keyword. Really.. yes</p>{{ 'a..b' }}";
        assert_eq!(norm(source), source);
        assert!(matches!(
            normalize("<p>elseif is a keyword</p>{{ 'elseif' }}").unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_ignores_identifiers_with_prefix() {
        assert_eq!(norm("{% elseiffy %}"), "{% elseiffy %}");
    }

    #[test]
    fn test_for_loops_iterate_values_or_pairs() {
        assert_eq!(
            norm("{% for x in items %}{% endfor %}"),
            "{% for x in (items)|twig_values %}{% endfor %}"
        );
        assert_eq!(
            norm("{%- for k, v in user.tags -%}"),
            "{%- for k, v in (user.tags)|twig_items -%}"
        );
        assert_eq!(
            norm("{% for x in items if x.active %}"),
            "{% for x in (items)|twig_values if x.active %}"
        );
    }

    #[test]
    fn test_range_operator() {
        assert_eq!(norm("{{ 1..3 }}"), "{{ twig_range(1, 3) }}");
        assert_eq!(
            norm("{% for i in 0..count %}"),
            "{% for i in (twig_range(0, count))|twig_values %}"
        );
        assert_eq!(norm("{{ 'a' .. 'c' }}"), "{{ twig_range('a', 'c') }}");
        assert_eq!(norm("{{ -2..2 }}"), "{{ twig_range(-2, 2) }}");
    }

    #[test]
    fn test_unsupported_range_is_syntax_error() {
        let err = normalize("line one\n{{ (a + 1)..3 }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Syntax);
        assert_eq!(err.line, Some(2));

        assert!(normalize("{{ x - 1..3 }}").is_err());
    }

    #[test]
    fn test_comments_and_raw_sections_untouched() {
        let source = "{# for x in 1..2 #}{% raw %}{% for a, b in c %}{{ 1..2 }}{% endraw %}";
        assert_eq!(norm(source), source);
    }

    #[test]
    fn test_line_count_preserved() {
        let source = "{% for x in\n items %}\n{{ x }}\n{% endfor %}";
        assert_eq!(norm(source).matches('\n').count(), 3);
    }
}
