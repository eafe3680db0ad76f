//! `Link` response header parsing

use std::{collections::HashMap, str::FromStr};

use compact_str::CompactString;
use reqwest::header::{HeaderMap, LINK};

use super::error::{ClientError, Result};

pub const NEXT: &str = "next";

/// Relation label to URL mapping taken from one response.
///
/// A set is never merged with another one: each response replaces the
/// previous set when deciding what to request next.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkSet {
    links: HashMap<CompactString, CompactString>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting point of a walk: a set whose only relation is `next`.
    pub fn starting_at(url: impl Into<CompactString>) -> Self {
        let mut links = Self::new();
        links.insert(NEXT, url);
        links
    }

    /// Parse a raw header value such as
    /// `<https://x/?page=2>; rel="next", <https://x/?page=9>; rel="last"`.
    ///
    /// A blank value yields an empty set and blank entries, such as the one
    /// after a trailing comma, are skipped. A later entry with the same label
    /// replaces an earlier one.
    pub fn parse(header: &str) -> Result<Self> {
        let mut links = Self::new();

        for entry in header.split(',').filter(|entry| !entry.trim().is_empty()) {
            let (label, url) = parse_entry(entry)?;
            links.insert(label, url);
        }

        Ok(links)
    }

    /// Read the `Link` header of a response; an absent header is an empty set.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        match headers.get(LINK) {
            None => Ok(Self::new()),
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| ClientError::malformed_link("<non-ascii>", "header is not visible ASCII"))?;
                Self::parse(value)
            },
        }
    }

    pub fn insert(&mut self, label: impl Into<CompactString>, url: impl Into<CompactString>) {
        self.links.insert(label.into(), url.into());
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.links.get(label).map(CompactString::as_str)
    }

    pub fn next(&self) -> Option<&str> {
        self.get(NEXT)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.links.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl FromStr for LinkSet {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_entry(entry: &str) -> Result<(CompactString, CompactString)> {
    let entry = entry.trim();
    let mut segments = entry.split(';');

    let target = segments.next().map(str::trim).unwrap_or_default();
    let url = target
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .map(str::trim)
        .ok_or_else(|| ClientError::malformed_link(entry, "URL is not enclosed in angle brackets"))?;
    if url.is_empty() {
        return Err(ClientError::malformed_link(entry, "empty URL"));
    }

    let literal = segments
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rel"))
        .map(|(_, value)| value.trim())
        .ok_or_else(|| ClientError::malformed_link(entry, "missing rel= parameter"))?;

    let label: String = serde_json::from_str(literal)
        .map_err(|_| ClientError::malformed_link(entry, "rel value is not a quoted string"))?;

    Ok((label.into(), url.into()))
}
