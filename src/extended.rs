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
 * The native extended dialect.
 *
 * This is the format the editor materializes search results in.  A
 * record is a key line `KEY DN`, body lines, and a terminating blank
 * line:
 *
 * ```text
 * 0 cn=a,dc=example,dc=com
 * objectClass person
 * cn a
 * description:; first line\
 * second line
 * jpegPhoto:: iVBORw0KGgo=
 * ```
 *
 * The key classifies the record (see
 * [`RecordKey`](crate::parser::RecordKey)): numeric keys and arbitrary
 * tokens introduce plain attribute records, while `delete`, `modify`,
 * and `rename` records carry their own body grammars.  Attribute lines
 * are `attr value`, or `attr:ENC value` with an inline encoding: `:`
 * and `:;` backslash-escaped text, `::` base64, `:<` a `file://` URL,
 * `:N` exactly N raw bytes, and `:sha`-style tokens which hash the
 * following plaintext through the configured
 * [`PasswordEncoder`](crate::password::PasswordEncoder).
 *
 * ```
 * use ldapedit::Parser;
 * use ldapedit::extended::ExtendedParser;
 * use std::io::Cursor;
 *
 * let mut input = Cursor::new(&b"0 cn=a,dc=example,dc=com\ncn a\n"[..]);
 * let record = ExtendedParser::new()
 *     .read_entry(&mut input, None)?
 *     .expect("one record");
 * assert_eq!(record.entry.attribute("cn").unwrap().values()[0], b"a");
 * # Ok::<(), ldapedit::Error>(())
 * ```
 */

use crate::dn::Dn;
use crate::entry::{Entry, Mod, ModOp};
use crate::error::{Error, Result};
use crate::parser::{
    DeleteRecord, Lines, ModifyRecord, Parsed, Parser, Record, RecordKey,
    RenameRecord,
};
use crate::password::{DigestPasswords, PasswordEncoder, Scheme};
use crate::value::{self, PrinterOptions, Readability};
use std::io::{self, BufRead, Seek, Write};

/**
 * The extended-dialect [`Parser`].
 *
 * Password encodings such as `userPassword:ssha secret` are delegated
 * to a [`PasswordEncoder`]; [`new`](ExtendedParser::new) wires up the
 * bundled [`DigestPasswords`], [`with_passwords`] injects another.
 *
 * [`with_passwords`]: ExtendedParser::with_passwords
 */
#[derive(Clone, Debug, Default)]
pub struct ExtendedParser<P = DigestPasswords> {
    passwords: P,
}

impl ExtendedParser<DigestPasswords> {
    /** A parser using the bundled digest password encoder. */
    #[must_use]
    pub fn new() -> Self {
        ExtendedParser { passwords: DigestPasswords::new() }
    }
}

impl<P: PasswordEncoder> ExtendedParser<P> {
    /** A parser hashing passwords through `passwords`. */
    pub fn with_passwords(passwords: P) -> Self {
        ExtendedParser { passwords }
    }

    /*
     * Parse the next record, skipping leading blank lines, comments,
     * and a version header at offset 0.
     */
    fn parse_record<S: BufRead + Seek>(
        &self,
        lines: &mut Lines<S>,
    ) -> Result<Option<Parsed>> {
        let mut buf = Vec::new();
        loop {
            let start = lines.pos();
            if !lines.read_line(&mut buf)? {
                return Ok(None);
            }
            if buf.is_empty() || buf[0] == b'#' {
                continue;
            }
            let Some(sp) = buf.iter().position(|&b| b == b' ') else {
                return Err(Error::syntax(
                    start,
                    "expected a key and a distinguished name",
                ));
            };
            let token = bytes_to_str(&buf[..sp], start, "record key")?;
            let rest = bytes_to_str(&buf[sp + 1..], start, "name")?.to_string();
            if token == "version" {
                if start != 0 || rest != "ldapvi" {
                    return Err(Error::Version { pos: start, found: rest });
                }
                expect_end(lines, "version header")?;
                continue;
            }
            let key = RecordKey::classify(token);
            let dn = Dn::new(rest);
            return Ok(Some(match key {
                RecordKey::Delete => {
                    expect_end(lines, "delete record")?;
                    Parsed::Delete { dn, pos: start }
                }
                RecordKey::Modify => Parsed::Modify {
                    dn,
                    mods: self.parse_modify_body(lines)?,
                    pos: start,
                },
                RecordKey::Rename => {
                    let (new, delete_old_rdn) = parse_rename_body(lines)?;
                    Parsed::Rename { old: dn, new, delete_old_rdn, pos: start }
                }
                key => Parsed::Entry {
                    key,
                    entry: self.parse_attrval_body(lines, dn)?,
                    pos: start,
                },
            }));
        }
    }

    fn parse_attrval_body<S: BufRead + Seek>(
        &self,
        lines: &mut Lines<S>,
        dn: Dn,
    ) -> Result<Entry> {
        let mut entry = Entry::new(dn);
        let mut buf = Vec::new();
        loop {
            let lstart = lines.pos();
            if !lines.read_line(&mut buf)? || buf.is_empty() {
                return Ok(entry);
            }
            let (name, value) = self.parse_attrval(lines, &buf, lstart)?;
            entry.push_value(&name, value);
        }
    }

    /*
     * One attribute line.  The name runs to the first space or colon; a
     * colon introduces an inline encoding token, itself terminated by a
     * space.
     */
    fn parse_attrval<S: BufRead + Seek>(
        &self,
        lines: &mut Lines<S>,
        line: &[u8],
        lstart: u64,
    ) -> Result<(String, Vec<u8>)> {
        let mut name_end = None;
        for (i, &b) in line.iter().enumerate() {
            match b {
                0 => {
                    return Err(Error::syntax(
                        lstart,
                        "NUL byte in attribute name",
                    ));
                }
                b' ' | b':' => {
                    name_end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(i) = name_end else {
            return Err(Error::syntax(
                lstart,
                "attribute line without separator",
            ));
        };
        if i == 0 {
            return Err(Error::syntax(lstart, "empty attribute name"));
        }
        let name =
            bytes_to_str(&line[..i], lstart, "attribute name")?.to_string();
        if line[i] == b' ' {
            /* Plain form: the rest of the physical line, verbatim. */
            return Ok((name, line[i + 1..].to_vec()));
        }
        let rest = &line[i + 1..];
        let (enc, payload) = match rest.iter().position(|&b| b == b' ') {
            Some(j) => (&rest[..j], &rest[j + 1..]),
            None => (rest, &[][..]),
        };
        let value = match enc {
            b"" | b";" => decode_escaped(lines, payload, lstart)?,
            b":" => value::decode_base64(payload, lstart)?,
            b"<" => {
                let url = bytes_to_str(payload, lstart, "URL")?;
                value::read_file_url(url, lstart)?
            }
            _ => {
                let token = match std::str::from_utf8(enc) {
                    Ok(t) => t,
                    Err(_) => {
                        return Err(Error::encoding(
                            lstart,
                            "unknown value encoding",
                        ));
                    }
                };
                if token.bytes().all(|b| b.is_ascii_digit()) {
                    let count = token.parse().map_err(|_| {
                        Error::encoding(
                            lstart,
                            format!("unusable byte count {token:?}"),
                        )
                    })?;
                    /*
                     * The raw run starts right after the space and may
                     * itself contain newlines, so reposition past the
                     * header rather than trusting the line buffer.
                     */
                    let data = lstart + i as u64 + 2 + enc.len() as u64;
                    read_raw(lines, data, count, lstart)?
                } else if let Some(scheme) = Scheme::from_token(token) {
                    let plaintext = decode_escaped(lines, payload, lstart)?;
                    self.hash_password(scheme, &plaintext, lstart)?
                } else {
                    return Err(Error::encoding(
                        lstart,
                        format!("unknown value encoding :{token}"),
                    ));
                }
            }
        };
        Ok((name, value))
    }

    fn hash_password(
        &self,
        scheme: Scheme,
        plaintext: &[u8],
        lstart: u64,
    ) -> Result<Vec<u8>> {
        let hashed = self
            .passwords
            .encode(scheme, plaintext)
            .map_err(|e| Error::encoding(lstart, e.to_string()))?;
        if !hashed.starts_with(scheme.prefix().as_bytes()) {
            return Err(Error::encoding(
                lstart,
                format!(
                    "password encoder result lacks the {} prefix",
                    scheme.prefix()
                ),
            ));
        }
        Ok(hashed)
    }

    fn parse_modify_body<S: BufRead + Seek>(
        &self,
        lines: &mut Lines<S>,
    ) -> Result<Vec<Mod>> {
        let mut mods: Vec<Mod> = Vec::new();
        let mut buf = Vec::new();
        loop {
            let lstart = lines.pos();
            if !lines.read_line(&mut buf)? || buf.is_empty() {
                break;
            }
            if buf[0] == b' ' {
                let payload = &buf[1..];
                let value = if let Some(b64) = payload.strip_prefix(b":: ") {
                    value::decode_base64(b64, lstart)?
                } else {
                    decode_escaped(lines, payload, lstart)?
                };
                match mods.last_mut() {
                    Some(m) => m.values.push(value),
                    None => {
                        return Err(Error::syntax(
                            lstart,
                            "value line before an operation header",
                        ));
                    }
                }
            } else {
                check_modify_values(&mods, lstart)?;
                let Some(sp) = buf.iter().position(|&b| b == b' ') else {
                    return Err(Error::syntax(
                        lstart,
                        "expected an operation and an attribute",
                    ));
                };
                let token = bytes_to_str(&buf[..sp], lstart, "operation")?;
                let Some(op) = ModOp::from_token(token) else {
                    return Err(Error::syntax(
                        lstart,
                        format!("unknown modify operation {token:?}"),
                    ));
                };
                let attr = bytes_to_str(&buf[sp + 1..], lstart, "attribute")?;
                if attr.is_empty() {
                    return Err(Error::syntax(
                        lstart,
                        "operation without an attribute",
                    ));
                }
                mods.push(Mod {
                    op,
                    attribute: attr.to_string(),
                    values: Vec::new(),
                });
            }
        }
        check_modify_values(&mods, lines.pos())?;
        Ok(mods)
    }
}

impl<P: PasswordEncoder> Parser for ExtendedParser<P> {
    fn read_entry<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<Option<Record>> {
        let mut lines = Lines::new(stream, offset)?;
        match self.parse_record(&mut lines)? {
            None => Ok(None),
            Some(Parsed::Entry { key, entry, pos }) => {
                Ok(Some(Record { key, entry, pos }))
            }
            Some(other) => Err(other.key_error()),
        }
    }

    fn peek_entry<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<Option<(RecordKey, u64)>> {
        let mut lines = Lines::new(stream, offset)?;
        let start = lines.pos();
        let parsed = self.parse_record(&mut lines)?;
        let result = parsed.map(|p| (p.key(), p.pos()));
        lines.seek(start)?;
        Ok(result)
    }

    fn skip_entry<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<Option<(RecordKey, u64)>> {
        let mut lines = Lines::new(stream, offset)?;
        Ok(self.parse_record(&mut lines)?.map(|p| (p.key(), p.pos())))
    }

    fn read_delete<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<DeleteRecord> {
        let mut lines = Lines::new(stream, offset)?;
        let end = lines.pos();
        match self.parse_record(&mut lines)? {
            Some(Parsed::Delete { dn, pos }) => Ok(DeleteRecord { dn, pos }),
            Some(other) => Err(other.key_error()),
            None => Err(Error::syntax(end, "unexpected end of stream")),
        }
    }

    fn read_modify<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<ModifyRecord> {
        let mut lines = Lines::new(stream, offset)?;
        let end = lines.pos();
        match self.parse_record(&mut lines)? {
            Some(Parsed::Modify { dn, mods, pos }) => {
                Ok(ModifyRecord { dn, mods, pos })
            }
            Some(other) => Err(other.key_error()),
            None => Err(Error::syntax(end, "unexpected end of stream")),
        }
    }

    fn read_rename<S: BufRead + Seek>(
        &self,
        stream: &mut S,
        offset: Option<u64>,
    ) -> Result<RenameRecord> {
        let mut lines = Lines::new(stream, offset)?;
        let end = lines.pos();
        match self.parse_record(&mut lines)? {
            Some(Parsed::Rename { old, new, delete_old_rdn, pos }) => {
                Ok(RenameRecord { old, new, delete_old_rdn, pos })
            }
            Some(other) => Err(other.key_error()),
            None => Err(Error::syntax(end, "unexpected end of stream")),
        }
    }
}

fn bytes_to_str<'a>(
    bytes: &'a [u8],
    pos: u64,
    what: &str,
) -> Result<&'a str> {
    std::str::from_utf8(bytes)
        .map_err(|_| Error::syntax(pos, format!("{what} is not UTF-8")))
}

/* The next line must be blank, or the stream must end. */
fn expect_end<S: BufRead + Seek>(
    lines: &mut Lines<S>,
    what: &str,
) -> Result<()> {
    let start = lines.pos();
    let mut buf = Vec::new();
    if !lines.read_line(&mut buf)? || buf.is_empty() {
        return Ok(());
    }
    Err(Error::syntax(start, format!("trailing content in {what}")))
}

fn parse_rename_body<S: BufRead + Seek>(
    lines: &mut Lines<S>,
) -> Result<(Dn, bool)> {
    let start = lines.pos();
    let mut buf = Vec::new();
    if !lines.read_line(&mut buf)? || buf.is_empty() {
        return Err(Error::syntax(start, "rename record without a target"));
    }
    let Some(sp) = buf.iter().position(|&b| b == b' ') else {
        return Err(Error::syntax(
            start,
            "expected add or replace and a distinguished name",
        ));
    };
    let delete_old_rdn = match &buf[..sp] {
        b"add" => false,
        b"replace" => true,
        _ => {
            return Err(Error::syntax(
                start,
                "expected add or replace in rename record",
            ));
        }
    };
    let new = bytes_to_str(&buf[sp + 1..], start, "name")?.to_string();
    expect_end(lines, "rename record")?;
    Ok((Dn::new(new), delete_old_rdn))
}

/* An open add or replace must have collected at least one value. */
fn check_modify_values(mods: &[Mod], pos: u64) -> Result<()> {
    if let Some(m) = mods.last() {
        if m.values.is_empty() && m.op != ModOp::Delete {
            return Err(Error::syntax(
                pos,
                format!("{} of {} without values", m.op, m.attribute),
            ));
        }
    }
    Ok(())
}

/*
 * Decode a backslash-escaped value starting from the remainder of the
 * current line.  A backslash before the line end is a literal newline
 * and the value continues on the next physical line; a doubled
 * backslash is a single one.
 */
fn decode_escaped<S: BufRead + Seek>(
    lines: &mut Lines<S>,
    first: &[u8],
    lstart: u64,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(first.len());
    let mut line = first.to_vec();
    loop {
        let mut i = 0;
        let mut continued = false;
        while i < line.len() {
            if line[i] == b'\\' {
                if i + 1 == line.len() {
                    out.push(b'\n');
                    continued = true;
                    i += 1;
                } else if line[i + 1] == b'\\' {
                    out.push(b'\\');
                    i += 2;
                } else {
                    out.push(line[i]);
                    out.push(line[i + 1]);
                    i += 2;
                }
            } else {
                out.push(line[i]);
                i += 1;
            }
        }
        if !continued {
            return Ok(out);
        }
        if !lines.read_line(&mut line)? {
            return Err(Error::syntax(lstart, "end of stream inside value"));
        }
    }
}

/* Inverse of decode_escaped over a single value. */
fn escape_value(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for &b in value {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\\n"),
            _ => out.push(b),
        }
    }
    out
}

/*
 * A `:N` run: seek to the first data byte and take exactly N bytes,
 * then the line terminator.
 */
fn read_raw<S: BufRead + Seek>(
    lines: &mut Lines<S>,
    data: u64,
    count: usize,
    lstart: u64,
) -> Result<Vec<u8>> {
    lines.seek(data)?;
    let mut value = vec![0u8; count];
    if !lines.read_exact(&mut value)? {
        return Err(Error::syntax(lstart, "end of stream inside raw value"));
    }
    let mut terminator = [0u8; 1];
    if lines.read_exact(&mut terminator)? && terminator[0] != b'\n' {
        return Err(Error::syntax(lstart, "missing newline after raw value"));
    }
    Ok(value)
}

/*
 * Whether a value can ride on an escaped `attr:; ` line under the
 * given readability policy.  NUL always forces base64.
 */
fn escapable(value: &[u8], readability: Readability) -> bool {
    if value.contains(&0) {
        return false;
    }
    match readability {
        Readability::Ascii => value
            .iter()
            .all(|&b| (0x20..=0x7e).contains(&b) || b == b'\n' || b == b'\r'),
        Readability::Utf8 => match std::str::from_utf8(value) {
            Ok(s) => s
                .chars()
                .all(|c| (c >= ' ' && c != '\u{7f}') || c == '\n' || c == '\r'),
            Err(_) => false,
        },
        Readability::Any => true,
    }
}

/** Write the `version ldapvi` stream header. */
pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(b"version ldapvi\n")
}

/**
 * Write one entry record, preceded by a blank line.  Each value gets
 * one logical line: verbatim when safe under the options' readability
 * policy, backslash-escaped via `attr:; ` when it is merely unprintable
 * on one line, base64 otherwise.
 */
pub fn write_entry<W: Write>(
    out: &mut W,
    key: &RecordKey,
    entry: &Entry,
    opts: &PrinterOptions,
) -> io::Result<()> {
    writeln!(out, "\n{} {}", key, entry.dn())?;
    for attr in entry.attributes() {
        for value in attr.values() {
            write_attrval(out, attr.description(), value, opts)?;
        }
    }
    Ok(())
}

fn write_attrval<W: Write>(
    out: &mut W,
    name: &str,
    value: &[u8],
    opts: &PrinterOptions,
) -> io::Result<()> {
    if value::is_safe(value, opts.readability) {
        write!(out, "{name} ")?;
        out.write_all(value)?;
    } else if escapable(value, opts.readability) {
        write!(out, "{name}:; ")?;
        out.write_all(&escape_value(value))?;
    } else {
        write!(out, "{name}:: {}", value::encode_base64(value))?;
    }
    out.write_all(b"\n")
}

/** Write a `modify` record, preceded by a blank line. */
pub fn write_modify<W: Write>(
    out: &mut W,
    dn: &Dn,
    mods: &[Mod],
    opts: &PrinterOptions,
) -> io::Result<()> {
    writeln!(out, "\nmodify {dn}")?;
    for m in mods {
        writeln!(out, "{} {}", m.op, m.attribute)?;
        for value in &m.values {
            if value.starts_with(b":: ") || !escapable(value, opts.readability)
            {
                writeln!(out, " :: {}", value::encode_base64(value))?;
            } else {
                out.write_all(b" ")?;
                out.write_all(&escape_value(value))?;
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/** Write a `rename` record, preceded by a blank line. */
pub fn write_rename<W: Write>(
    out: &mut W,
    old: &Dn,
    new: &Dn,
    delete_old_rdn: bool,
) -> io::Result<()> {
    writeln!(out, "\nrename {old}")?;
    if delete_old_rdn {
        writeln!(out, "replace {new}")
    } else {
        writeln!(out, "add {new}")
    }
}

/** Write a `delete` record, preceded by a blank line. */
pub fn write_delete<W: Write>(out: &mut W, dn: &Dn) -> io::Result<()> {
    writeln!(out, "\ndelete {dn}")
}
