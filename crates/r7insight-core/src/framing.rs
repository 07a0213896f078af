// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire framing and oversize chunking of log lines.
//!
//! A framed message is
//!
//! ```text
//! [token][logId ][HostName=<name> ]<line with newlines replaced by U+2028>\n
//! ```
//!
//! with one write per message and no other framing.

use crate::constants::{LINE_SEPARATOR, NEWLINES};

/// Replaces embedded `\r\n` and `\n` with the Unicode line separator so a
/// multi-line event stays a single record on the wire.
#[must_use]
pub fn normalize_newlines(line: &str) -> String {
    NEWLINES
        .iter()
        .fold(line.to_string(), |acc, newline| acc.replace(newline, LINE_SEPARATOR))
}

/// Strips trailing carriage returns and line feeds.
#[must_use]
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Builds wire messages with a fixed prefix computed once per worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Framer {
    token: String,
    prefix: String,
}

impl Framer {
    /// `token` is `None` in DataHub mode. Empty `log_id` and `None`
    /// `host_name` contribute nothing.
    #[must_use]
    pub fn new(token: Option<&str>, log_id: &str, host_name: Option<&str>) -> Self {
        let mut prefix = String::new();
        if !log_id.is_empty() {
            prefix.push_str(log_id);
            prefix.push(' ');
        }
        if let Some(host_name) = host_name {
            prefix.push_str("HostName=");
            prefix.push_str(host_name);
            prefix.push(' ');
        }
        Self {
            token: token.unwrap_or_default().to_string(),
            prefix,
        }
    }

    #[must_use]
    pub fn frame(&self, line: &str) -> Vec<u8> {
        let line = normalize_newlines(line);
        let mut message =
            String::with_capacity(self.token.len() + self.prefix.len() + line.len() + 1);
        message.push_str(&self.token);
        message.push_str(&self.prefix);
        message.push_str(&line);
        message.push('\n');
        message.into_bytes()
    }
}

/// Result of splitting one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunks<'a> {
    pub chunks: Vec<&'a str>,
    /// Bytes beyond the chunk budget that were not kept.
    pub dropped_bytes: usize,
}

/// Splits `line` into at most `max_chunks` pieces of at most `limit` bytes.
///
/// Pieces end on UTF-8 character boundaries, so a piece may be a few bytes
/// shorter than `limit` when the limit falls inside a multi-byte character.
/// An empty line yields one empty piece.
#[must_use]
pub fn split_chunks(line: &str, limit: usize, max_chunks: usize) -> Chunks<'_> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut remaining = line;

    while chunks.len() < max_chunks {
        if remaining.len() <= limit {
            chunks.push(remaining);
            remaining = "";
            break;
        }

        let mut cut = limit;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // limit is narrower than the first character
            cut = remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i);
        }

        let (head, tail) = remaining.split_at(cut);
        chunks.push(head);
        remaining = tail;
    }

    Chunks {
        chunks,
        dropped_bytes: remaining.len(),
    }
}
