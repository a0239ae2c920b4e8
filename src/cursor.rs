//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use serde::{Deserialize, Serialize};

/// An opaque, serializable resume token within an index traversal.
///
/// The executor never inspects the bytes; it only asks whether the cursor is
/// [`Cursor::is_terminal`]. `IndexFetchClient` implementations are free to
/// encode whatever internal state they need (a remote iterator handle, a last
/// key, a page token) into `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    token: Vec<u8>,
    terminal: bool,
}

impl Cursor {
    /// A cursor seeded from an index filter at scan initialization. Not
    /// terminal: the first fetch always has something to ask for.
    pub fn start(token: impl Into<Vec<u8>>) -> Cursor {
        Cursor {
            token: token.into(),
            terminal: false,
        }
    }

    /// The terminal cursor: "no further rows". A fetch must never be issued
    /// while a split's cursor is terminal.
    pub fn terminal() -> Cursor {
        Cursor {
            token: Vec::new(),
            terminal: true,
        }
    }

    pub fn resume(token: impl Into<Vec<u8>>, terminal: bool) -> Cursor {
        Cursor {
            token: token.into(),
            terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }
}

impl Default for Cursor {
    fn default() -> Cursor {
        Cursor::start(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_cursor_carries_no_token() {
        let c = Cursor::terminal();
        assert!(c.is_terminal());
        assert!(c.token().is_empty());
    }

    #[test]
    fn start_cursor_is_not_terminal() {
        let c = Cursor::start(b"seed".to_vec());
        assert!(!c.is_terminal());
    }
}
