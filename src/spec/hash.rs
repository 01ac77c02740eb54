use serde_yaml::Value;
use sha2::{Digest as _, Sha256};

/// Canonical content hash of a parsed YAML document.
///
/// Keys are sorted at every level and numbers are normalized, so the hash is independent of key
/// order, quoting and whitespace in the source text.
pub(crate) fn canonical_hash(v: &Value) -> String {
    let mut out = String::new();
    write_canonical(v, &mut out);
    sha256_hex(out.as_bytes())
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut s = String::with_capacity(64);
    for b in digest {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn write_canonical(v: &Value, out: &mut String) {
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else if let Some(f) = n.as_f64() {
                out.push_str(&f.to_string());
            }
        }
        Value::String(s) => write_string(s, out),
        Value::Sequence(seq) => {
            out.push('[');
            for (i, item) in seq.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Mapping(m) => {
            let mut entries: Vec<(String, &Value)> = m
                .iter()
                .map(|(k, v)| {
                    let mut key = String::new();
                    match k {
                        Value::String(s) => key.push_str(s),
                        other => write_canonical(other, &mut key),
                    }
                    (key, v)
                })
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(&k, out);
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Tagged(t) => {
            out.push_str("!<");
            out.push_str(&t.tag.to_string());
            out.push('>');
            write_canonical(&t.value, out);
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/spec/hash.rs"]
mod tests;
