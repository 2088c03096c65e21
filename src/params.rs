use url::form_urlencoded;

/// Characters that carry meaning in PostgREST's filter grammar.
const RESERVED: [char; 5] = [',', '.', ':', '(', ')'];

/// Quotes a value or column name when it contains reserved punctuation.
///
/// Plain values pass through untouched. Values containing any of `,.:()`
/// are wrapped in double quotes, with `\` and `"` backslash-escaped, so the
/// server reads them as one literal.
pub fn sanitize_param(param: &str) -> String {
    if !param.contains(RESERVED) {
        return param.to_owned();
    }

    let mut quoted = String::with_capacity(param.len() + 2);
    quoted.push('"');
    for ch in param.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Formats `<operator>.<criteria>`; criteria must already be sanitized.
pub fn encode_filter(operator: &str, criteria: &str) -> String {
    format!("{operator}.{criteria}")
}

/// Sanitizes each element and joins them with `,` between `open` and `close`.
pub(crate) fn list_literal<I, S>(values: I, open: char, close: char) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = values
        .into_iter()
        .map(|value| sanitize_param(value.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    format!("{open}{joined}{close}")
}

pub(crate) fn range_literal(from: i64, to: i64) -> String {
    format!("({from},{to})")
}

/// Ordered multimap of query parameters.
///
/// Keys keep first-insertion order, values keep call order within a key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every value under `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => *values = vec![value],
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Adds `value` under `key`, keeping any values already present.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Returns the first value under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, value)` pairs, one per stored value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Encodes as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_filter, list_literal, range_literal, sanitize_param, QueryParams};

    #[test]
    fn sanitize_passes_plain_values_through() {
        assert_eq!(sanitize_param("kit"), "kit");
        assert_eq!(sanitize_param("42"), "42");
        assert_eq!(sanitize_param("with space"), "with space");
    }

    #[test]
    fn sanitize_quotes_reserved_punctuation() {
        assert_eq!(sanitize_param(":col.name"), "\":col.name\"");
        assert_eq!(sanitize_param("a,b"), "\"a,b\"");
        assert_eq!(sanitize_param("f(x)"), "\"f(x)\"");
    }

    #[test]
    fn sanitize_escapes_quotes_inside_quoted_values() {
        assert_eq!(sanitize_param(r#"say "hi", ok"#), r#""say \"hi\", ok""#);
        assert_eq!(sanitize_param(r"c:\dir"), r#""c:\\dir""#);
    }

    #[test]
    fn encode_filter_prefixes_operator() {
        assert_eq!(encode_filter("eq", "1"), "eq.1");
        assert_eq!(encode_filter("not.in", "(a,b)"), "not.in.(a,b)");
    }

    #[test]
    fn list_literal_sanitizes_each_element() {
        assert_eq!(list_literal(["a", "b"], '(', ')'), "(a,b)");
        assert_eq!(list_literal(["x,y", "z"], '{', '}'), "{\"x,y\",z}");
        assert_eq!(list_literal(Vec::<String>::new(), '(', ')'), "()");
    }

    #[test]
    fn range_literal_formats_bounds() {
        assert_eq!(range_literal(1, 10), "(1,10)");
        assert_eq!(range_literal(-5, 0), "(-5,0)");
    }

    #[test]
    fn set_overwrites_and_append_accumulates() {
        let mut params = QueryParams::new();
        params.set("select", "id");
        params.set("select", "id,name");
        params.append("x", "gte.a");
        params.append("x", "lte.b");

        assert_eq!(params.get_all("select"), ["id,name"]);
        assert_eq!(params.get_all("x"), ["gte.a", "lte.b"]);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn encode_keeps_repeated_keys_in_call_order() {
        let mut params = QueryParams::new();
        params.append("x", "gte.a");
        params.append("y", "eq.1");
        params.append("x", "lte.b");

        assert_eq!(params.encode(), "x=gte.a&x=lte.b&y=eq.1");
    }

    #[test]
    fn encode_escapes_reserved_url_characters() {
        let mut params = QueryParams::new();
        params.append("name", "eq.a&b c");

        assert_eq!(params.encode(), "name=eq.a%26b+c");
    }
}
