//! `key=value` header arguments.

use super::{ResolveError, ResolveResult};

/// Ordered header arguments, validated as a whole before use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSpec {
    entries: Vec<(String, String)>,
}

impl HeaderSpec {
    /// Parse `key=value` strings.
    ///
    /// Any entry without exactly one `=` fails the whole parse.
    pub fn parse<I, S>(raw: I) -> ResolveResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = raw
            .into_iter()
            .map(|entry| parse_entry(entry.as_ref()))
            .collect::<ResolveResult<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// Append an already split header.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(entry: &str) -> ResolveResult<(String, String)> {
    let mut parts = entry.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => Ok((key.to_string(), value.to_string())),
        _ => Err(ResolveError::InvalidHeader(entry.to_string())),
    }
}
