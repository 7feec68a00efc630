//! Twig compatibility filters layered on top of the engine builtins.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use minijinja::value::ValueKind;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, State, Value};

/// Twig's default `date` format
const DEFAULT_DATE_FORMAT: &str = "F j, Y H:i";

/// Loop source for `for k, v in ...`
pub(super) const ITEMS_FILTER: &str = "twig_items";
/// Loop source for single-target `for` loops
pub(super) const VALUES_FILTER: &str = "twig_values";
/// Inclusive `a..b` range
pub(super) const RANGE_FUNCTION: &str = "twig_range";

const MAX_RANGE_LEN: u64 = 100_000;

pub(super) fn register(env: &mut Environment<'static>) {
    env.add_filter("raw", raw);
    env.add_filter("keys", keys);
    env.add_filter("json_encode", json_encode);
    env.add_filter("nl2br", nl2br);
    env.add_filter("striptags", striptags);
    env.add_filter("number_format", number_format);
    env.add_filter("date", date);
    env.add_filter(ITEMS_FILTER, twig_items);
    env.add_filter(VALUES_FILTER, twig_values);
    env.add_function(RANGE_FUNCTION, twig_range);
}

/// Mark a value as safe so it bypasses escaping
fn raw(value: Value) -> Value {
    Value::from_safe_string(value.to_string())
}

/// Keys of a mapping, or indices of a sequence
fn keys(value: Value) -> Result<Value, Error> {
    match value.kind() {
        ValueKind::Map => Ok(Value::from(value.try_iter()?.collect::<Vec<_>>())),
        ValueKind::Seq => {
            let len = value.len().unwrap_or(0) as u64;
            Ok(Value::from((0..len).map(Value::from).collect::<Vec<_>>()))
        }
        ValueKind::Undefined | ValueKind::None => Ok(Value::from(Vec::<Value>::new())),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            "keys filter expects a mapping or a sequence",
        )),
    }
}

/// `[key, value]` pairs of a mapping, `[index, item]` pairs of a sequence
fn twig_items(value: Value) -> Result<Value, Error> {
    match value.kind() {
        ValueKind::Map => {
            let mut pairs = Vec::new();
            for key in value.try_iter()? {
                let item = value.get_item(&key)?;
                pairs.push(Value::from(vec![key, item]));
            }
            Ok(Value::from(pairs))
        }
        ValueKind::Seq => Ok(Value::from(
            value
                .try_iter()?
                .enumerate()
                .map(|(i, item)| Value::from(vec![Value::from(i), item]))
                .collect::<Vec<_>>(),
        )),
        ValueKind::Undefined | ValueKind::None => Ok(Value::from(Vec::<Value>::new())),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            "cannot iterate key/value pairs of this value",
        )),
    }
}

/// Mappings iterate their values; everything else passes through
fn twig_values(value: Value) -> Result<Value, Error> {
    if value.kind() != ValueKind::Map {
        return Ok(value);
    }

    let mut values = Vec::new();
    for key in value.try_iter()? {
        values.push(value.get_item(&key)?);
    }
    Ok(Value::from(values))
}

/// Inclusive range over integers or single characters, in either direction
fn twig_range(start: Value, end: Value) -> Result<Value, Error> {
    if let (Some(a), Some(b)) = (single_char(&start), single_char(&end)) {
        let chars = inclusive(a as i64, b as i64)?
            .into_iter()
            .filter_map(|c| u32::try_from(c).ok().and_then(char::from_u32))
            .map(|c| Value::from(c.to_string()))
            .collect::<Vec<_>>();
        return Ok(Value::from(chars));
    }

    let a = range_bound(start)?;
    let b = range_bound(end)?;
    Ok(Value::from(
        inclusive(a, b)?.into_iter().map(Value::from).collect::<Vec<_>>(),
    ))
}

fn single_char(value: &Value) -> Option<char> {
    let mut chars = value.as_str()?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_ascii_digit() => Some(c),
        _ => None,
    }
}

fn range_bound(value: Value) -> Result<i64, Error> {
    if let Some(text) = value.as_str() {
        return text.trim().parse().map_err(|_| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("range bound '{}' is not an integer", text),
            )
        });
    }
    if value.is_undefined() || value.is_none() {
        return Ok(0);
    }
    i64::try_from(value)
}

fn inclusive(a: i64, b: i64) -> Result<Vec<i64>, Error> {
    if a.abs_diff(b) >= MAX_RANGE_LEN {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("range {}..{} is too large", a, b),
        ));
    }
    Ok(if a <= b {
        (a..=b).collect()
    } else {
        (b..=a).rev().collect()
    })
}

fn json_encode(value: Value) -> Result<Value, Error> {
    let encoded = serde_json::to_string(&value).map_err(|e| {
        Error::new(ErrorKind::BadSerialization, "cannot encode value as JSON").with_source(e)
    })?;
    Ok(Value::from_safe_string(encoded))
}

/// Insert `<br />` before every newline
fn nl2br(state: &State, value: Value) -> Value {
    let text = value.to_string();
    let text = if matches!(state.auto_escape(), AutoEscape::None) {
        text
    } else {
        minijinja::HtmlEscape(&text).to_string()
    };
    Value::from_safe_string(text.replace('\n', "<br />\n"))
}

/// Remove markup tags, keeping text content
fn striptags(value: Value) -> String {
    let text = value.to_string();
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;

    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    out
}

/// `number_format(decimals = 0, dec_point = ".", thousands_sep = ",")`
fn number_format(
    value: Value,
    decimals: Option<usize>,
    dec_point: Option<String>,
    thousands_sep: Option<String>,
) -> Result<String, Error> {
    let number = if let Some(text) = value.as_str() {
        text.trim().parse::<f64>().map_err(|_| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("number_format cannot parse '{}' as a number", text),
            )
        })?
    } else if value.is_undefined() || value.is_none() {
        0.0
    } else {
        f64::try_from(value)?
    };

    let decimals = decimals.unwrap_or(0);
    let dec_point = dec_point.as_deref().unwrap_or(".");
    let thousands_sep = thousands_sep.as_deref().unwrap_or(",");

    let fixed = format!("{:.*}", decimals, number.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    if number < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(integer, thousands_sep));
    if let Some(fraction) = fraction {
        out.push_str(dec_point);
        out.push_str(fraction);
    }

    Ok(out)
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }

    out
}

/// Format a date string or unix timestamp with a PHP-style format.
///
/// Undefined or null input renders as the empty string; the current time is
/// never substituted so that output only depends on the context.
fn date(value: Value, format: Option<String>) -> Result<String, Error> {
    if value.is_undefined() || value.is_none() {
        return Ok(String::new());
    }

    let moment = parse_moment(&value)?;
    let pattern = php_to_strftime(format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT));
    Ok(moment.format(&pattern).to_string())
}

fn parse_moment(value: &Value) -> Result<DateTime<FixedOffset>, Error> {
    if let Some(text) = value.as_str() {
        let text = text.trim();

        if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
            return Ok(moment);
        }
        for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
                return Ok(naive.and_utc().fixed_offset());
            }
        }
        if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Ok(day.and_time(NaiveTime::default()).and_utc().fixed_offset());
        }

        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("date filter cannot parse '{}'", text),
        ));
    }

    if let Ok(seconds) = i64::try_from(value.clone()) {
        return DateTime::from_timestamp(seconds, 0)
            .map(|moment| moment.fixed_offset())
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "timestamp out of range"));
    }

    Err(Error::new(
        ErrorKind::InvalidOperation,
        "date filter expects a date string or a unix timestamp",
    ))
}

/// Translate PHP `date()` format characters into a strftime pattern.
fn php_to_strftime(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        let spec = match ch {
            'd' => "%d",
            'D' => "%a",
            'j' => "%-d",
            'l' => "%A",
            'N' => "%u",
            'w' => "%w",
            'W' => "%V",
            'F' => "%B",
            'm' => "%m",
            'M' => "%b",
            'n' => "%-m",
            'Y' => "%Y",
            'y' => "%y",
            'a' => "%P",
            'A' => "%p",
            'g' => "%-I",
            'G' => "%-H",
            'h' => "%I",
            'H' => "%H",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'T' => "%Z",
            'P' => "%:z",
            'O' => "%z",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            'U' => "%s",
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_literal(&mut out, escaped);
                }
                continue;
            }
            other => {
                push_literal(&mut out, other);
                continue;
            }
        };
        out.push_str(spec);
    }

    out
}

fn push_literal(out: &mut String, ch: char) {
    if ch == '%' {
        out.push_str("%%");
    } else {
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::renderer::TemplateRenderer;
    use serde_json::json;

    fn render(template: &str, variables: serde_json::Value) -> String {
        TemplateRenderer::new()
            .render(template, &variables)
            .unwrap()
            .html
    }

    #[test]
    fn test_php_format_translation() {
        assert_eq!(php_to_strftime("Y-m-d"), "%Y-%m-%d");
        assert_eq!(php_to_strftime("j F Y, G:i"), "%-d %B %Y, %-H:%M");
        assert_eq!(php_to_strftime("\\Y 100%"), "Y 100%%");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1", ","), "1");
        assert_eq!(group_thousands("1234", ","), "1,234");
        assert_eq!(group_thousands("1234567", " "), "1 234 567");
        assert_eq!(group_thousands("123456", ","), "123,456");
    }

    #[test]
    fn test_number_format_filter() {
        assert_eq!(render("{{ 1234.5|number_format(2) }}", json!({})), "1,234.50");
        assert_eq!(
            render("{{ n|number_format(2, ',', '.') }}", json!({"n": 1234567.891})),
            "1.234.567,89"
        );
        assert_eq!(render("{{ n|number_format }}", json!({"n": -9876})), "-9,876");
        assert_eq!(render("{{ n|number_format(1) }}", json!({"n": "42"})), "42.0");
    }

    #[test]
    fn test_date_filter() {
        assert_eq!(
            render("{{ d|date('d/m/Y') }}", json!({"d": "2024-03-05"})),
            "05/03/2024"
        );
        assert_eq!(
            render("{{ d|date('j F Y, G:i') }}", json!({"d": "2024-03-05T14:30:00Z"})),
            "5 March 2024, 14:30"
        );
        assert_eq!(render("{{ ts|date('Y') }}", json!({"ts": 0})), "1970");
    }

    #[test]
    fn test_date_filter_on_missing_value_is_empty() {
        assert_eq!(render("[{{ missing|date('Y') }}]", json!({})), "[]");
    }

    #[test]
    fn test_date_filter_rejects_garbage() {
        let err = TemplateRenderer::new()
            .render("{{ d|date }}", &json!({"d": "not a date"}))
            .unwrap_err();
        assert!(err.message.contains("date"));
    }

    #[test]
    fn test_keys_filter() {
        assert_eq!(
            render("{{ m|keys|join(',') }}", json!({"m": {"a": 1, "b": 2}})),
            "a,b"
        );
        assert_eq!(render("{{ s|keys|join(',') }}", json!({"s": ["x", "y"]})), "0,1");
    }

    #[test]
    fn test_json_encode_filter() {
        assert_eq!(
            render("{{ data|json_encode }}", json!({"data": {"a": [1, 2]}})),
            r#"{"a":[1,2]}"#
        );
    }

    #[test]
    fn test_nl2br_filter() {
        assert_eq!(render("{{ t|nl2br }}", json!({"t": "a\nb"})), "a<br />\nb");
    }

    #[test]
    fn test_striptags_filter() {
        assert_eq!(
            render("{{ t|striptags }}", json!({"t": "<p>Hello <b>World</b></p>"})),
            "Hello World"
        );
    }

    #[test]
    fn test_nl2br_escapes_before_breaking() {
        let renderer = TemplateRenderer::with_config(&RendererConfig {
            autoescape: true,
            trim_blocks: true,
        });
        let html = renderer
            .render("{{ t|nl2br }}", &json!({"t": "<b> & \"q\"\nnext"}))
            .unwrap()
            .html;
        assert_eq!(html, "&lt;b&gt; &amp; &quot;q&quot;<br />\nnext");
    }

    #[test]
    fn test_twig_items_filter() {
        assert_eq!(
            render("{{ m|twig_items|tojson }}", json!({"m": {"a": 1}})),
            r#"[["a",1]]"#
        );
        assert_eq!(
            render("{{ s|twig_items|tojson }}", json!({"s": ["x"]})),
            r#"[[0,"x"]]"#
        );
        assert_eq!(render("{{ missing|twig_items|length }}", json!({})), "0");
    }

    #[test]
    fn test_range_rejects_huge_span() {
        let err = TemplateRenderer::new()
            .render("{{ twig_range(0, n)|length }}", &json!({"n": 10_000_000}))
            .unwrap_err();
        assert!(err.message.contains("too large"));
    }
}
