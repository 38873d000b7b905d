// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! APRS symbol table selection: a position line carries a table character
//! before the longitude field and a symbol code after it.

/// A two-character APRS symbol: the table selector and the symbol code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub table: char,
    pub code: char,
}

impl Symbol {
    pub const fn new(table: char, code: char) -> Self {
        Self { table, code }
    }

    /// The primary-table jogging/person icon, used as a sensible default
    /// for a mesh node with no configured symbol.
    pub const fn default_node() -> Self {
        Self::new('/', '>')
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::default_node()
    }
}
