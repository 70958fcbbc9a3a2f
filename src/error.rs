/*
 * Copyright (c) 2026 Jonathan Perkin <jonathan@perkin.org.uk>
 *
 * Permission to use, copy, modify, and distribute this software for any
 * purpose with or without fee is hereby granted, provided that the above
 * copyright notice and this permission notice appear in all copies.
 *
 * THE SOFTWARE IS PROVIDED "AS IS" AND THE AUTHOR DISCLAIMS ALL WARRANTIES
 * WITH REGARD TO THIS SOFTWARE INCLUDING ALL IMPLIED WARRANTIES OF
 * MERCHANTABILITY AND FITNESS. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR
 * ANY SPECIAL, DIRECT, INDIRECT, OR CONSEQUENTIAL DAMAGES OR ANY DAMAGES
 * WHATSOEVER RESULTING FROM LOSS OF USE, DATA OR PROFITS, WHETHER IN AN
 * ACTION OF CONTRACT, NEGLIGENCE OR OTHER TORTIOUS ACTION, ARISING OUT OF
 * OR IN CONNECTION WITH THE USE OR PERFORMANCE OF THIS SOFTWARE.
 */

/*!
 * Error types shared by the parsers, the printers, and the diff engine.
 *
 * Errors that describe a problem with the input carry the absolute byte
 * offset of the offending record or line, so that an interactive caller
 * can position an editor on it.  [`Error::position`] returns the offset
 * for those variants and [`None`] for the rest.
 */

use std::io;
use thiserror::Error;

/** A [`Result`](std::result::Result) type alias using [`enum@Error`]. */
pub type Result<T> = std::result::Result<T, Error>;

/** Errors reported while parsing, printing, or comparing entry streams. */
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /** Structural violation in the input. */
    #[error("{message} at byte {pos}")]
    Syntax {
        /** Byte offset of the offending input. */
        pos: u64,
        /** Description of the violation. */
        message: String,
    },

    /** A value could not be decoded. */
    #[error("{message} at byte {pos}")]
    Encoding {
        /** Byte offset of the offending value. */
        pos: u64,
        /** Description of the decoding failure. */
        message: String,
    },

    /** A version header with an unsupported value. */
    #[error("unsupported version {found:?} at byte {pos}")]
    Version {
        /** Byte offset of the version header. */
        pos: u64,
        /** The version value found in the input. */
        found: String,
    },

    /** A well-formed construct this implementation declines to handle. */
    #[error("{construct} is not supported at byte {pos}")]
    NotSupported {
        /** Byte offset of the construct. */
        pos: u64,
        /** Name of the rejected construct. */
        construct: String,
    },

    /** A record key of the wrong kind, or a duplicate or out-of-range
     * numeric key. */
    #[error("unexpected record key {key:?} at byte {pos}")]
    Key {
        /** Byte offset of the record carrying the key. */
        pos: u64,
        /** The offending key, as written in the input. */
        key: String,
    },

    /** An entry cannot be renamed. */
    #[error("cannot rename {dn:?}: {reason}")]
    Rename {
        /** The distinguished name of the entry. */
        dn: String,
        /** Why the rename was refused. */
        reason: String,
    },

    /** A change handler asked for the comparison to stop. */
    #[error("change handler aborted")]
    Aborted,

    /** I/O error on one of the underlying streams. */
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /** Returns the byte offset for this error, if it has one. */
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::Syntax { pos, .. }
            | Self::Encoding { pos, .. }
            | Self::Version { pos, .. }
            | Self::NotSupported { pos, .. }
            | Self::Key { pos, .. } => Some(*pos),
            Self::Rename { .. } | Self::Aborted | Self::Io(_) => None,
        }
    }

    pub(crate) fn syntax(pos: u64, message: impl Into<String>) -> Self {
        Error::Syntax { pos, message: message.into() }
    }

    pub(crate) fn encoding(pos: u64, message: impl Into<String>) -> Self {
        Error::Encoding { pos, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_position() {
        let e = Error::syntax(42, "missing separator");
        assert_eq!(e.position(), Some(42));
        assert_eq!(e.to_string(), "missing separator at byte 42");

        let e = Error::Aborted;
        assert_eq!(e.position(), None);
    }
}
