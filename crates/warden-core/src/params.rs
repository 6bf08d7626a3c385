//! Tool parameter conventions and canonical encoding.
//!
//! Tool parameters are free-form JSON. The mediation layer only looks at a
//! handful of well-known keys: [`PATH_KEYS`], [`URL_KEY`], [`CONTENT_KEY`]
//! and [`COMMAND_KEY`].

use serde_json::Value;
use std::fmt::Write as _;

/// Keys that hold a filesystem path, checked in order.
pub const PATH_KEYS: [&str; 2] = ["path", "file_path"];

/// Key that holds a URL.
pub const URL_KEY: &str = "url";

/// Key that holds file content to be written.
pub const CONTENT_KEY: &str = "content";

/// Key that holds a command line.
pub const COMMAND_KEY: &str = "command";

/// The first path parameter present in `params`.
#[must_use]
pub fn path_param(params: &Value) -> Option<&str> {
    PATH_KEYS
        .iter()
        .find_map(|k| params.get(*k).and_then(Value::as_str))
}

/// The URL parameter, if present.
#[must_use]
pub fn url_param(params: &Value) -> Option<&str> {
    params.get(URL_KEY).and_then(Value::as_str)
}

/// The content parameter, if present.
#[must_use]
pub fn content_param(params: &Value) -> Option<&str> {
    params.get(CONTENT_KEY).and_then(Value::as_str)
}

/// The command parameter, if present.
#[must_use]
pub fn command_param(params: &Value) -> Option<&str> {
    params.get(COMMAND_KEY).and_then(Value::as_str)
}

/// Encode a JSON value with object keys sorted at every depth.
///
/// Two semantically identical values always produce the same string,
/// whatever order their keys were inserted in.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        Value::String(s) => write_string(s, out),
        scalar => {
            let _ = write!(out, "{scalar}");
        },
    }
}

fn write_string(s: &str, out: &mut String) {
    // Value's Display escapes exactly like the serializer does.
    let _ = write!(out, "{}", Value::String(s.to_owned()));
}
