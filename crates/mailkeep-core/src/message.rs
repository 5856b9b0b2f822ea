//! Inbound message abstraction
//!
//! The event source that delivers a received message is external to Mailkeep.
//! It is seen only through [`InboundEmail`]: envelope addresses, a header
//! lookup, the raw body stream, and a forward-to-address primitive.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::ForwardError;

/// A received message as exposed by the event source.
///
/// The pipeline only reads from it; the single mutating action is
/// [`InboundEmail::forward`].
#[async_trait]
pub trait InboundEmail: Send + Sync {
    /// Envelope sender address
    fn sender(&self) -> &str;

    /// Envelope recipient address
    fn recipient(&self) -> &str;

    /// Message headers with case-insensitive lookup
    fn headers(&self) -> &Headers;

    /// Raw message stream, read to the end once per invocation
    fn raw(&self) -> Pin<Box<dyn AsyncRead + Send + Unpin + '_>>;

    /// Forward the original message to `address`
    async fn forward(&self, address: &str) -> Result<(), ForwardError>;
}

/// Header mapping with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, keeping the first value seen for a given name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.trim().to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the header block of a raw RFC 5322 message.
    ///
    /// Stops at the first empty line. Folded lines are joined with a single
    /// space. Lines without a colon are skipped. The body is never touched.
    pub fn parse(raw: &[u8]) -> Self {
        let mut headers = Headers::new();
        let text = String::from_utf8_lossy(raw);
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.insert(&name, value);
            }
            current = line
                .split_once(':')
                .map(|(name, value)| (name.to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.insert(&name, value);
        }
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}
