//! `${name.id}` references between resources
//!
//! A string property may embed the external identifier of another resource,
//! e.g. `"${vpc.id}"` or `"arn:aws:s3:::${bucket.id}/*"`. Every reference is
//! an implicit dependency and is substituted just before the provider call.

use crate::resource::Properties;
use std::collections::BTreeSet;

const OPEN: &str = "${";
const CLOSE: char = '}';
const ID_SUFFIX: &str = ".id";

/// Collect the names referenced anywhere inside `properties`.
pub fn references(properties: &Properties) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for value in properties.values() {
        collect(value, &mut names);
    }
    names
}

fn collect(value: &serde_json::Value, names: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::String(s) => {
            for span in placeholders(s) {
                names.insert(span.name.to_string());
            }
        }
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect(v, names)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect(v, names)),
        _ => {}
    }
}

/// Substitute every reference using `lookup`.
///
/// Returns the name of the first reference `lookup` cannot answer.
pub fn resolve<F>(properties: &Properties, lookup: F) -> Result<Properties, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = Properties::new();
    for (key, value) in properties {
        resolved.insert(key.clone(), substitute(value, &lookup)?);
    }
    Ok(resolved)
}

fn substitute<F>(value: &serde_json::Value, lookup: &F) -> Result<serde_json::Value, String>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(match value {
        serde_json::Value::String(s) => serde_json::Value::String(substitute_str(s, lookup)?),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|v| substitute(v, lookup))
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), substitute(v, lookup)?);
            }
            serde_json::Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute_str<F>(s: &str, lookup: &F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(s.len());
    let mut cursor = 0;
    for span in placeholders(s) {
        let id = lookup(span.name).ok_or_else(|| span.name.to_string())?;
        out.push_str(&s[cursor..span.start]);
        out.push_str(&id);
        cursor = span.end;
    }
    out.push_str(&s[cursor..]);
    Ok(out)
}

struct Placeholder<'a> {
    name: &'a str,
    start: usize,
    end: usize,
}

/// Well-formed `${name.id}` spans in order of appearance.
fn placeholders(s: &str) -> Vec<Placeholder<'_>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while let Some(open) = s[offset..].find(OPEN) {
        let start = offset + open;
        let body_start = start + OPEN.len();
        let Some(close) = s[body_start..].find(CLOSE) else {
            break;
        };
        let body_end = body_start + close;
        let body = &s[body_start..body_end];
        match body.strip_suffix(ID_SUFFIX) {
            Some(name) if !name.is_empty() && !name.contains(OPEN) => {
                spans.push(Placeholder {
                    name,
                    start,
                    end: body_end + 1,
                });
                offset = body_end + 1;
            }
            _ => offset = body_start,
        }
    }
    spans
}
