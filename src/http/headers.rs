//! Header fields of a request or response.

/// One header field. `key` is the ASCII-lowercased name used for lookups;
/// `name` keeps the spelling that goes on the wire.
#[derive(Debug, Clone)]
struct Field {
    key: String,
    name: String,
    value: String,
}

impl Field {
    fn new(name: String, value: String) -> Self {
        Self {
            key: name.to_ascii_lowercase(),
            name,
            value,
        }
    }
}

/// Ordered header fields with case-insensitive names.
///
/// A name may repeat; [`get`](Self::get) returns the first occurrence and
/// [`get_all`](Self::get_all) every one. List-valued headers such as `Vary`
/// are best extended with [`append_token`](Self::append_token), which keeps
/// them in a single field.
///
/// # Examples
///
/// ```
/// use webwire::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.set("Content-Type", "text/css");
/// headers.append_token("Vary", "Accept-Encoding");
/// headers.append_token("vary", "Origin");
/// headers.append_token("VARY", "origin");
///
/// assert_eq!(headers.get("content-type"), Some("text/css"));
/// assert_eq!(headers.get("Vary"), Some("Accept-Encoding, Origin"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<Field>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.key.eq_ignore_ascii_case(name))
    }

    /// Appends a field, keeping earlier fields with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field::new(name.into(), value.into()));
    }

    /// Replaces every field named `name` with one carrying `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let field = Field::new(name.into(), value.into());
        self.fields.retain(|existing| existing.key != field.key);
        self.fields.push(field);
    }

    /// Adds `token` to the comma-separated list in the first `name` field,
    /// creating the field if needed. Tokens already listed (compared
    /// case-insensitively) are not repeated.
    pub fn append_token(&mut self, name: impl Into<String>, token: &str) {
        let name = name.into();
        let Some(index) = self.position(&name) else {
            self.insert(name, token);
            return;
        };

        let field = &mut self.fields[index];
        let listed = field
            .value
            .split(',')
            .any(|item| item.trim().eq_ignore_ascii_case(token));
        if listed {
            return;
        }
        if field.value.trim().is_empty() {
            field.value = token.to_owned();
        } else {
            field.value.push_str(", ");
            field.value.push_str(token);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|index| self.fields[index].value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |field| field.key.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// Removes every field named `name`; `true` if any existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields
            .retain(|field| !field.key.eq_ignore_ascii_case(name));
        self.fields.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of fields, counting repeated names separately.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `(name, value)` pairs in wire order, names as inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        headers.extend(iter);
        headers
    }
}

impl<N, V> Extend<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_spelling_survives_lookup_folding() {
        let h: Headers = [("X-Request-ID", "abc")].into_iter().collect();
        assert_eq!(h.get("x-request-id"), Some("abc"));
        assert_eq!(h.iter().next(), Some(("X-Request-ID", "abc")));
    }

    #[test]
    fn repeated_names_stay_in_order() {
        let mut h = Headers::new();
        h.insert("Set-Cookie", "a=1");
        h.insert("Allow", "GET");
        h.insert("set-cookie", "b=2");
        assert_eq!(h.get_all("SET-COOKIE").collect::<Vec<_>>(), ["a=1", "b=2"]);
        assert_eq!(h.get("set-cookie"), Some("a=1"));
    }

    #[test]
    fn set_collapses_to_one_field() {
        let mut h = Headers::new();
        h.insert("Content-Length", "0");
        h.insert("content-length", "12");
        h.set("Content-Length", "42");
        assert_eq!(h.len(), 1);
        assert_eq!(h.get("content-length"), Some("42"));
    }

    #[test]
    fn append_token_merges_list_values() {
        let mut h = Headers::new();
        h.append_token("Vary", "Origin");
        assert_eq!(h.get("vary"), Some("Origin"));

        h.set("Vary", "Accept-Encoding");
        h.append_token("Vary", "Origin");
        h.append_token("Vary", "ORIGIN");
        assert_eq!(h.get("vary"), Some("Accept-Encoding, Origin"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn remove_reports_whether_anything_matched() {
        let mut h = Headers::new();
        h.insert("Allow", "GET");
        assert!(h.remove("allow"));
        assert!(h.is_empty());
        assert!(!h.remove("allow"));
        assert!(!h.contains("allow"));
    }
}
