//! Minimal percent-decoding for `!sub:pattern=...` delimiters and `!include`
//! query fragments (`?k=v&flag`). Neither the teacher nor the rest of the
//! pack pulls in a dedicated URL crate for this, and the grammar here is a
//! small closed subset (no `+`-as-space, no component-aware encode side).

pub fn decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(h * 16 + l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Splits `path?k=v&flag` into the bare reference and an ordered list of
/// `(key, value)` pairs; a bare `flag` token is stored as `(flag, "true")`.
pub fn split_query(reference: &str) -> (&str, Vec<(String, String)>) {
    let Some((base, query)) = reference.split_once('?') else {
        return (reference, Vec::new());
    };
    let pairs = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), "true".to_string()),
        })
        .collect();
    (base, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_sequences() {
        assert_eq!(decode("%3A%3A"), "::");
        assert_eq!(decode("plain"), "plain");
        assert_eq!(decode("%2"), "%2");
    }

    #[test]
    fn splits_query_fragment() {
        let (base, pairs) = split_query("pkg.yaml?env=prod&strict");
        assert_eq!(base, "pkg.yaml");
        assert_eq!(
            pairs,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("strict".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn no_query_fragment() {
        let (base, pairs) = split_query("pkg.yaml");
        assert_eq!(base, "pkg.yaml");
        assert!(pairs.is_empty());
    }
}
