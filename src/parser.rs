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
 * The record parser interface shared by both on-disk dialects.
 *
 * Streams of entries come in two shapes, the native extended dialect
 * ([`ExtendedParser`]) and RFC 2849 LDIF ([`LdifParser`]).  Both expose
 * the same operations through the [`Parser`] trait, so the diff engine
 * and other callers are written once against the trait and
 * monomorphised per dialect.
 *
 * Records are read from any `BufRead + Seek` stream.  Each successful
 * operation reports the absolute byte offset of the first significant
 * byte of the record, past any blank lines, comments, and version
 * header; those offsets are stable and can be handed back later as the
 * `offset` argument to re-read the same record.
 *
 * [`ExtendedParser`]: crate::extended::ExtendedParser
 * [`LdifParser`]: crate::ldif::LdifParser
 */

use crate::dn::Dn;
use crate::entry::{Entry, Mod};
use crate::error::{Error, Result};
use std::fmt;
use std::io::{self, BufRead, Seek, SeekFrom};

/**
 * The classification of a record, taken from its key token.
 *
 * In a clean file written by the printer every entry carries a numeric
 * key; an edited copy may also contain the four change keywords, the
 * printer's `entry` placeholder, or arbitrary tokens.
 */
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RecordKey {
    /** A numeric back-reference into the clean file. */
    Index(usize),
    /** The `add` change keyword. */
    Add,
    /** The `delete` change keyword. */
    Delete,
    /** The `modify` change keyword. */
    Modify,
    /** The `rename` change keyword. */
    Rename,
    /** Any other token, `entry` and `replace` included. */
    Token(String),
}

impl RecordKey {
    /**
     * Classify a key token: the four change keywords map to their
     * variants, a decimal integer to [`RecordKey::Index`], anything
     * else, including integers too large to index with, stays a
     * [`RecordKey::Token`].
     */
    #[must_use]
    pub fn classify(token: &str) -> RecordKey {
        match token {
            "add" => RecordKey::Add,
            "delete" => RecordKey::Delete,
            "modify" => RecordKey::Modify,
            "rename" => RecordKey::Rename,
            _ => {
                if !token.is_empty()
                    && token.bytes().all(|b| b.is_ascii_digit())
                {
                    match token.parse() {
                        Ok(n) => RecordKey::Index(n),
                        Err(_) => RecordKey::Token(token.to_string()),
                    }
                } else {
                    RecordKey::Token(token.to_string())
                }
            }
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordKey::Index(n) => write!(f, "{n}"),
            RecordKey::Add => write!(f, "add"),
            RecordKey::Delete => write!(f, "delete"),
            RecordKey::Modify => write!(f, "modify"),
            RecordKey::Rename => write!(f, "rename"),
            RecordKey::Token(s) => write!(f, "{s}"),
        }
    }
}

/** An entry record as returned by [`Parser::read_entry`]. */
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /** The record's key. */
    pub key: RecordKey,
    /** The parsed entry. */
    pub entry: Entry,
    /** Byte offset of the record's first significant byte. */
    pub pos: u64,
}

/** A `delete` record. */
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteRecord {
    /** The name of the entry to delete. */
    pub dn: Dn,
    /** Byte offset of the record's first significant byte. */
    pub pos: u64,
}

/** A `modify` record. */
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModifyRecord {
    /** The name of the entry to modify. */
    pub dn: Dn,
    /** The modifications, in document order. */
    pub mods: Vec<Mod>,
    /** Byte offset of the record's first significant byte. */
    pub pos: u64,
}

/** A `rename` record. */
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenameRecord {
    /** The entry's current name. */
    pub old: Dn,
    /** The entry's new name. */
    pub new: Dn,
    /** Whether the old RDN value is removed from the entry. */
    pub delete_old_rdn: bool,
    /** Byte offset of the record's first significant byte. */
    pub pos: u64,
}

/**
 * Record-level operations over a seekable stream, implemented once per
 * dialect.
 *
 * `offset` selects where to parse: [`None`] continues from the current
 * stream position, `Some(o)` seeks to `o` first.  The entry readers
 * return [`None`] at end of stream.  After an error the stream position
 * is unspecified; callers that need to retry must save and restore it
 * themselves, which is what the diff engine does.
 */
pub trait Parser {
    /**
     * Read one entry record: its key, the parsed entry, and its offset.
     *
     * Accepts any attrval-shaped record, which includes numeric keys,
     * arbitrary tokens, and the `add` keyword.  A `delete`, `modify`, or
     * `rename` record is a [`Key`](crate::Error::Key) error.
     *
     * # Errors
     *
     * Any of the input error kinds, or I/O failure.
     */
    fn read_entry<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<Option<Record>>;

    /**
     * Classify the next record without consuming it.  Returns the same
     * key and offset [`read_entry`](Parser::read_entry) would, with the
     * stream position restored.
     *
     * # Errors
     *
     * Any of the input error kinds, or I/O failure.
     */
    fn peek_entry<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<Option<(RecordKey, u64)>>;

    /**
     * Consume one record, validating it but building nothing, and
     * return its key and offset.  The stream is left at the first byte
     * past the record's terminator.
     *
     * # Errors
     *
     * Any of the input error kinds, or I/O failure.
     */
    fn skip_entry<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<Option<(RecordKey, u64)>>;

    /**
     * Read a `delete` record.
     *
     * # Errors
     *
     * [`Key`](crate::Error::Key) if the record at `offset` is any other
     * kind, [`Syntax`](crate::Error::Syntax) at end of stream.
     */
    fn read_delete<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<DeleteRecord>;

    /**
     * Read a `modify` record.
     *
     * # Errors
     *
     * [`Key`](crate::Error::Key) if the record at `offset` is any other
     * kind, [`Syntax`](crate::Error::Syntax) at end of stream.
     */
    fn read_modify<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<ModifyRecord>;

    /**
     * Read a `rename` record.
     *
     * # Errors
     *
     * [`Key`](crate::Error::Key) if the record at `offset` is any other
     * kind, [`Syntax`](crate::Error::Syntax) at end of stream.
     */
    fn read_rename<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<RenameRecord>;
}

/**
 * An iterator over the entry records of a stream, ending at end of
 * stream or on the first error.
 *
 * ```
 * use ldapedit::ldif::LdifParser;
 * use ldapedit::parser::Records;
 * use std::io::Cursor;
 *
 * let mut input = Cursor::new(&b"dn: dc=a\n\ndn: dc=b\n"[..]);
 * let names: Vec<String> = Records::new(&LdifParser, &mut input)
 *     .map(|r| Ok(r?.entry.dn().to_string()))
 *     .collect::<ldapedit::Result<_>>()?;
 * assert_eq!(names, ["dc=a", "dc=b"]);
 * # Ok::<(), ldapedit::Error>(())
 * ```
 */
pub struct Records<'a, P, S> {
    parser: &'a P,
    stream: &'a mut S,
}

impl<'a, P: Parser, S: BufRead + Seek> Records<'a, P, S> {
    /** Iterate the records of `stream` from its current position. */
    pub fn new(parser: &'a P, stream: &'a mut S) -> Self {
        Records { parser, stream }
    }
}

impl<P: Parser, S: BufRead + Seek> Iterator for Records<'_, P, S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.read_entry(self.stream, None).transpose()
    }
}

/*
 * What a dialect's record parser produced.  The public readers narrow
 * this to the record type they were asked for, turning everything else
 * into a Key error.
 */
pub(crate) enum Parsed {
    Entry { key: RecordKey, entry: Entry, pos: u64 },
    Delete { dn: Dn, pos: u64 },
    Modify { dn: Dn, mods: Vec<Mod>, pos: u64 },
    Rename { old: Dn, new: Dn, delete_old_rdn: bool, pos: u64 },
}

impl Parsed {
    pub(crate) fn key(&self) -> RecordKey {
        match self {
            Parsed::Entry { key, .. } => key.clone(),
            Parsed::Delete { .. } => RecordKey::Delete,
            Parsed::Modify { .. } => RecordKey::Modify,
            Parsed::Rename { .. } => RecordKey::Rename,
        }
    }

    pub(crate) fn pos(&self) -> u64 {
        match self {
            Parsed::Entry { pos, .. }
            | Parsed::Delete { pos, .. }
            | Parsed::Modify { pos, .. }
            | Parsed::Rename { pos, .. } => *pos,
        }
    }

    pub(crate) fn key_error(&self) -> Error {
        Error::Key { pos: self.pos(), key: self.key().to_string() }
    }
}

/*
 * A byte-position-tracking line reader.  Both dialect parsers work in
 * terms of physical lines plus the occasional raw byte run; this keeps
 * the absolute offset current without a seek syscall per line.
 */
pub(crate) struct Lines<'a, S: BufRead + Seek> {
    stream: &'a mut S,
    pos: u64,
}

impl<'a, S: BufRead + Seek> Lines<'a, S> {
    /*
     * Position the stream per the `offset` convention and capture the
     * starting offset.
     */
    pub(crate) fn new(
        stream: &'a mut S,
        offset: Option<u64>,
    ) -> io::Result<Self> {
        let pos = match offset {
            Some(o) => {
                stream.seek(SeekFrom::Start(o))?;
                o
            }
            None => stream.stream_position()?,
        };
        Ok(Lines { stream, pos })
    }

    /* Offset of the next unread byte. */
    pub(crate) fn pos(&self) -> u64 {
        self.pos
    }

    /*
     * Read one physical line into `buf`, excluding the terminating LF.
     * Returns false at end of stream.
     */
    pub(crate) fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        let n = self.stream.read_until(b'\n', buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.pos += n as u64;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(true)
    }

    /* The next byte, if any, without consuming it. */
    pub(crate) fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.stream.fill_buf()?.first().copied())
    }

    /*
     * Read exactly `buf.len()` raw bytes.  Returns false if the stream
     * ends first, in which case the position is still advanced past
     * whatever was read.
     */
    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        let mut done = 0;
        while done < buf.len() {
            let n = self.stream.read(&mut buf[done..])?;
            if n == 0 {
                self.pos += done as u64;
                return Ok(false);
            }
            done += n;
        }
        self.pos += done as u64;
        Ok(true)
    }

    /* Seek to an absolute offset. */
    pub(crate) fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.stream.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn key_classification() {
        assert_eq!(RecordKey::classify("0"), RecordKey::Index(0));
        assert_eq!(RecordKey::classify("37"), RecordKey::Index(37));
        assert_eq!(RecordKey::classify("add"), RecordKey::Add);
        assert_eq!(RecordKey::classify("delete"), RecordKey::Delete);
        assert_eq!(RecordKey::classify("modify"), RecordKey::Modify);
        assert_eq!(RecordKey::classify("rename"), RecordKey::Rename);
        assert_eq!(
            RecordKey::classify("replace"),
            RecordKey::Token("replace".to_string())
        );
        assert_eq!(
            RecordKey::classify("entry"),
            RecordKey::Token("entry".to_string())
        );
        /* Signs and leading junk keep a token a token. */
        assert_eq!(
            RecordKey::classify("-1"),
            RecordKey::Token("-1".to_string())
        );
        assert_eq!(
            RecordKey::classify("1x"),
            RecordKey::Token("1x".to_string())
        );
    }

    #[test]
    fn key_display() {
        for token in ["0", "12", "add", "delete", "modify", "rename", "entry"]
        {
            assert_eq!(RecordKey::classify(token).to_string(), token);
        }
    }

    #[test]
    fn lines_positions() -> io::Result<()> {
        let mut input = Cursor::new(&b"one\ntwo\nlast"[..]);
        let mut lines = Lines::new(&mut input, None)?;
        let mut buf = Vec::new();

        assert!(lines.read_line(&mut buf)?);
        assert_eq!(buf, b"one");
        assert_eq!(lines.pos(), 4);

        assert_eq!(lines.peek_byte()?, Some(b't'));
        assert!(lines.read_line(&mut buf)?);
        assert_eq!(lines.pos(), 8);

        /* Final line has no terminator. */
        assert!(lines.read_line(&mut buf)?);
        assert_eq!(buf, b"last");
        assert_eq!(lines.pos(), 12);
        assert!(!lines.read_line(&mut buf)?);

        lines.seek(4)?;
        assert!(lines.read_line(&mut buf)?);
        assert_eq!(buf, b"two");
        Ok(())
    }

    #[test]
    fn lines_raw_bytes() -> io::Result<()> {
        let mut input = Cursor::new(&b"abc\0\ndef"[..]);
        let mut lines = Lines::new(&mut input, Some(0))?;
        let mut raw = [0u8; 4];
        assert!(lines.read_exact(&mut raw)?);
        assert_eq!(&raw, b"abc\0");
        assert_eq!(lines.pos(), 4);

        let mut rest = [0u8; 8];
        assert!(!lines.read_exact(&mut rest)?);
        Ok(())
    }
}
