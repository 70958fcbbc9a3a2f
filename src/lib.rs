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
 * # ldapedit
 *
 * The engine room of a `vipw`-style editor for LDAP directories: it
 * prints a set of directory entries into an editable text file, parses
 * the file the user hands back, and computes the minimum sequence of
 * directory operations separating the two.
 *
 * The pieces, bottom up:
 *
 * - [`Entry`], [`Attribute`], [`Mod`] — the in-memory model, with
 *   case-insensitive attribute descriptions and byte-buffer values.
 * - [`Dn`] — distinguished names and the little RDN arithmetic that
 *   renames need.
 * - [`extended`] and [`ldif`] — the two on-disk dialects, each a
 *   [`Parser`] plus printing functions.  The extended dialect is the
 *   native editor format with one `KEY DN` line per record; LDIF is
 *   RFC 2849.
 * - [`diff`] — [`compare_streams`](diff::compare_streams), which walks
 *   the edited file against the original and reports adds, deletes,
 *   changes, and renames to a [`ChangeHandler`](diff::ChangeHandler).
 * - [`password`] — the pluggable hash gateway behind the
 *   `userPassword:ssha secret` convenience encodings.
 *
 * Everything operates on caller-supplied `BufRead + Seek` streams; the
 * crate opens no connections and holds no global state.
 *
 * ```
 * use ldapedit::extended::{self, ExtendedParser};
 * use ldapedit::value::PrinterOptions;
 * use ldapedit::{Entry, Parser, RecordKey};
 * use std::io::Cursor;
 *
 * let mut entry = Entry::new("cn=a,dc=example,dc=com");
 * entry.push_value("objectClass", "person");
 * entry.push_value("cn", "a");
 *
 * let mut clean = Vec::new();
 * extended::write_entry(
 *     &mut clean,
 *     &RecordKey::Index(0),
 *     &entry,
 *     &PrinterOptions::default(),
 * )?;
 *
 * let mut stream = Cursor::new(clean);
 * let record = ExtendedParser::new()
 *     .read_entry(&mut stream, None)?
 *     .expect("one record");
 * assert_eq!(record.key, RecordKey::Index(0));
 * assert_eq!(record.entry, entry);
 * # Ok::<(), anyhow::Error>(())
 * ```
 */

#![deny(missing_docs)]

pub use crate::dn::Dn;
pub use crate::entry::{Attribute, Entry, Mod, ModOp};
pub use crate::error::{Error, Result};
pub use crate::parser::{Parser, Record, RecordKey};

pub mod diff;
pub mod dn;
pub mod entry;
pub mod error;
pub mod extended;
pub mod ldif;
pub mod parser;
pub mod password;
pub mod value;
