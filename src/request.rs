use reqwest::Method;

use crate::params::{encode_filter, sanitize_param, QueryParams};

pub(crate) const ACCEPT: &str = "Accept";
pub(crate) const CONTENT_TYPE: &str = "Content-Type";
pub(crate) const ACCEPT_PROFILE: &str = "Accept-Profile";
pub(crate) const CONTENT_PROFILE: &str = "Content-Profile";
pub(crate) const AUTHORIZATION: &str = "Authorization";
pub(crate) const PREFER: &str = "Prefer";
pub(crate) const RANGE: &str = "Range";
pub(crate) const RANGE_UNIT: &str = "Range-Unit";

/// Header map holding one value per name; the last write wins.
///
/// Names compare ASCII case-insensitively and keep their first spelling.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Copies every entry of `other` over this set.
    pub fn overlay(&mut self, other: &HeaderSet) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Accumulated state of one request as it moves through the builder stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestState {
    path: String,
    method: Method,
    query: QueryParams,
    headers: HeaderSet,
    body: Option<Result<Vec<u8>, String>>,
    negate_next: bool,
}

impl RequestState {
    pub(crate) fn new(path: String, headers: HeaderSet) -> Self {
        Self {
            path,
            method: Method::GET,
            query: QueryParams::new(),
            headers,
            body: None,
            negate_next: false,
        }
    }

    /// Resource path, with its leading `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Serialized JSON payload, if the verb carries one.
    ///
    /// Returns `None` both when there is no body and when serialization
    /// failed; the failure is reported at execution time.
    pub fn body(&self) -> Option<&[u8]> {
        match &self.body {
            Some(Ok(bytes)) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    pub fn negate_next(&self) -> bool {
        self.negate_next
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub(crate) fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub(crate) fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.query.set(key, value);
    }

    pub(crate) fn set_body(&mut self, body: Result<Vec<u8>, String>) {
        self.body = Some(body);
    }

    pub(crate) fn take_body(&mut self) -> Option<Result<Vec<u8>, String>> {
        self.body.take()
    }

    pub(crate) fn mark_negate_next(&mut self) {
        self.negate_next = true;
    }

    /// Appends `column=<operator>.<criteria>`, consuming a pending negation.
    pub(crate) fn push_filter(&mut self, column: &str, operator: &str, criteria: &str) {
        let value = if std::mem::take(&mut self.negate_next) {
            encode_filter(&format!("not.{operator}"), criteria)
        } else {
            encode_filter(operator, criteria)
        };
        self.query.append(sanitize_param(column), value);
    }

    /// Sets the inclusive `Range` covering `size` items from `start`.
    pub(crate) fn set_range(&mut self, size: u64, start: u64) {
        // Signed so a zero size yields `start-(start-1)`, e.g. `0--1`.
        let end = i128::from(start) + i128::from(size) - 1;
        self.headers.set(RANGE_UNIT, "items");
        self.headers.set(RANGE, format!("{start}-{end}"));
    }
}
