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
 * RFC 2849 LDIF reading and writing.
 *
 * Records are introduced by a `dn:` line and separated by blank lines;
 * a physical line starting with a space continues the previous logical
 * line, comments included.  An optional `changetype` classifies each
 * record as an add (the default), delete, modify, or rename; modify
 * bodies are operation blocks closed by `-` lines, renames carry
 * `newrdn`, `deleteoldrdn`, and optionally `newsuperior`.
 *
 * Two deliberate deviations from a general-purpose LDIF reader: the
 * `control:` line is rejected as unsupported, and the proprietary
 * `ldapvi-key:` line classifies add records the same way the extended
 * dialect's key tokens do, without becoming an attribute of the entry.
 *
 * ```
 * use ldapedit::Parser;
 * use ldapedit::ldif::LdifParser;
 * use std::io::Cursor;
 *
 * let mut input = Cursor::new(
 *     &b"dn: cn=a,dc=example,dc=com\ncn: a\nsn:: Yg==\n"[..],
 * );
 * let record = LdifParser.read_entry(&mut input, None)?.expect("record");
 * assert_eq!(record.entry.attribute("sn").unwrap().values()[0], b"b");
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
use crate::value::{self, PrinterOptions};
use std::io::{self, BufRead, Seek, Write};

/* Fold point for printed logical lines. */
const WRAP: usize = 76;

/** The RFC 2849 [`Parser`]. */
#[derive(Clone, Copy, Debug, Default)]
pub struct LdifParser;

/* How a record body is to be read, per its changetype. */
#[derive(Clone, Copy, Eq, PartialEq)]
enum Kind {
    Add,
    Delete,
    Modify,
    Rename,
}

/* The payload shape of one logical attribute line. */
enum Spec<'a> {
    Raw(&'a [u8]),
    Base64(&'a [u8]),
    Url(&'a [u8]),
}

impl LdifParser {
    fn parse_record<S: BufRead + Seek>(
        &self,
        lines: &mut Lines<S>,
    ) -> Result<Option<Parsed>> {
        let mut buf = Vec::new();

        /* Preamble: blank lines, comments, version header at the top. */
        let pos = loop {
            let start = lines.pos();
            if !read_logical(lines, &mut buf)? {
                return Ok(None);
            }
            if buf.is_empty() || buf[0] == b'#' {
                continue;
            }
            if start == 0 && buf.starts_with(b"version:") {
                let (_, spec) = split_attr_line(&buf, start)?;
                let found = resolve_text(spec, start)?;
                if found != "1" {
                    return Err(Error::Version { pos: start, found });
                }
                continue;
            }
            break start;
        };

        let (name, spec) = split_attr_line(&buf, pos)?;
        if !name.eq_ignore_ascii_case("dn") {
            return Err(Error::syntax(pos, "expected a dn line"));
        }
        if matches!(spec, Spec::Url(_)) {
            return Err(Error::syntax(pos, "dn cannot come from a URL"));
        }
        let dn_text = resolve_text(spec, pos)?;
        if !dn_text.contains('=') {
            return Err(Error::syntax(pos, "distinguished name without '='"));
        }
        let dn = Dn::new(dn_text);

        let mut kind: Option<Kind> = None;
        let mut body_seen = false;
        let mut key_token: Option<String> = None;
        let mut entry = Entry::new(dn.clone());
        let mut mods: Vec<Mod> = Vec::new();
        let mut block: Option<Mod> = None;
        let mut newrdn: Option<String> = None;
        let mut delete_old: Option<bool> = None;
        let mut newsuperior: Option<String> = None;

        loop {
            let lstart = lines.pos();
            if !read_logical(lines, &mut buf)? || buf.is_empty() {
                break;
            }
            if buf[0] == b'#' {
                continue;
            }
            if buf == b"-" {
                if kind != Some(Kind::Modify) {
                    return Err(Error::syntax(
                        lstart,
                        "'-' outside a modify record",
                    ));
                }
                let Some(m) = block.take() else {
                    return Err(Error::syntax(
                        lstart,
                        "'-' without an operation",
                    ));
                };
                if m.values.is_empty() && m.op == ModOp::Add {
                    return Err(Error::syntax(
                        lstart,
                        format!("add of {} without values", m.attribute),
                    ));
                }
                mods.push(m);
                continue;
            }

            let (name, spec) = split_attr_line(&buf, lstart)?;
            if name.eq_ignore_ascii_case("control") {
                return Err(Error::NotSupported {
                    pos: lstart,
                    construct: "control line".to_string(),
                });
            }
            if name.eq_ignore_ascii_case("changetype") {
                if kind.is_some() {
                    return Err(Error::syntax(lstart, "repeated changetype"));
                }
                if body_seen {
                    return Err(Error::syntax(
                        lstart,
                        "changetype after attribute content",
                    ));
                }
                let text = resolve_text(spec, lstart)?;
                kind = Some(match text.as_str() {
                    "add" => Kind::Add,
                    "delete" => Kind::Delete,
                    "modify" => Kind::Modify,
                    "modrdn" | "moddn" => Kind::Rename,
                    _ => {
                        return Err(Error::syntax(
                            lstart,
                            format!("unknown changetype {text:?}"),
                        ));
                    }
                });
                continue;
            }
            if name.eq_ignore_ascii_case("ldapvi-key") {
                key_token = Some(resolve_text(spec, lstart)?);
                continue;
            }

            body_seen = true;
            match kind.unwrap_or(Kind::Add) {
                Kind::Add => {
                    let value = resolve(spec, lstart)?;
                    entry.push_value(&name, value);
                }
                Kind::Delete => {
                    return Err(Error::syntax(
                        lstart,
                        "delete record with a body",
                    ));
                }
                Kind::Modify => match &mut block {
                    Some(m) => {
                        if !m.attribute.eq_ignore_ascii_case(&name) {
                            return Err(Error::syntax(
                                lstart,
                                format!(
                                    "expected values of {}, got {}",
                                    m.attribute, name
                                ),
                            ));
                        }
                        m.values.push(resolve(spec, lstart)?);
                    }
                    None => {
                        let Some(op) = ModOp::from_token(&name) else {
                            return Err(Error::syntax(
                                lstart,
                                format!(
                                    "expected a modify operation, got {name:?}"
                                ),
                            ));
                        };
                        let attribute = resolve_text(spec, lstart)?;
                        if attribute.is_empty() {
                            return Err(Error::syntax(
                                lstart,
                                "operation without an attribute",
                            ));
                        }
                        block =
                            Some(Mod { op, attribute, values: Vec::new() });
                    }
                },
                Kind::Rename => {
                    let text = resolve_text(spec, lstart)?;
                    if newrdn.is_none() {
                        if !name.eq_ignore_ascii_case("newrdn") {
                            return Err(Error::syntax(
                                lstart,
                                "expected newrdn",
                            ));
                        }
                        newrdn = Some(text);
                    } else if delete_old.is_none() {
                        if !name.eq_ignore_ascii_case("deleteoldrdn") {
                            return Err(Error::syntax(
                                lstart,
                                "expected deleteoldrdn",
                            ));
                        }
                        delete_old = Some(match text.as_str() {
                            "0" => false,
                            "1" => true,
                            _ => {
                                return Err(Error::syntax(
                                    lstart,
                                    "deleteoldrdn must be 0 or 1",
                                ));
                            }
                        });
                    } else if newsuperior.is_none()
                        && name.eq_ignore_ascii_case("newsuperior")
                    {
                        newsuperior = Some(text);
                    } else {
                        return Err(Error::syntax(
                            lstart,
                            "unexpected attribute in rename record",
                        ));
                    }
                }
            }
        }

        match kind.unwrap_or(Kind::Add) {
            Kind::Add => {
                let key = match key_token {
                    Some(token) => RecordKey::classify(&token),
                    None => RecordKey::Add,
                };
                Ok(Some(Parsed::Entry { key, entry, pos }))
            }
            Kind::Delete => Ok(Some(Parsed::Delete { dn, pos })),
            Kind::Modify => {
                if block.is_some() {
                    return Err(Error::syntax(
                        lines.pos(),
                        "modify block without terminating '-'",
                    ));
                }
                Ok(Some(Parsed::Modify { dn, mods, pos }))
            }
            Kind::Rename => {
                let Some(newrdn) = newrdn else {
                    return Err(Error::syntax(
                        lines.pos(),
                        "rename record without newrdn",
                    ));
                };
                let Some(delete_old_rdn) = delete_old else {
                    return Err(Error::syntax(
                        lines.pos(),
                        "rename record without deleteoldrdn",
                    ));
                };
                let new = dn.modrdn_target(&newrdn, newsuperior.as_deref());
                Ok(Some(Parsed::Rename { old: dn, new, delete_old_rdn, pos }))
            }
        }
    }
}

impl Parser for LdifParser {
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

/*
 * One logical line: a physical line plus any continuations, which are
 * physical lines starting with a single space.  CRLF endings are
 * tolerated.
 */
fn read_logical<S: BufRead + Seek>(
    lines: &mut Lines<S>,
    buf: &mut Vec<u8>,
) -> io::Result<bool> {
    if !lines.read_line(buf)? {
        return Ok(false);
    }
    strip_cr(buf);
    while lines.peek_byte()? == Some(b' ') {
        let mut cont = Vec::new();
        lines.read_line(&mut cont)?;
        strip_cr(&mut cont);
        buf.extend_from_slice(&cont[1..]);
    }
    Ok(true)
}

fn strip_cr(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

/*
 * Split `name:value-spec`.  `::` marks base64 and `:<` a URL, both
 * tolerating leading fill spaces; a plain value loses exactly one
 * leading space.
 */
fn split_attr_line<'a>(
    line: &'a [u8],
    lstart: u64,
) -> Result<(String, Spec<'a>)> {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return Err(Error::syntax(lstart, "attribute line without ':'"));
    };
    let name = &line[..colon];
    if name.is_empty() {
        return Err(Error::syntax(lstart, "empty attribute name"));
    }
    if name.contains(&0) {
        return Err(Error::syntax(lstart, "NUL byte in attribute name"));
    }
    let name = std::str::from_utf8(name)
        .map_err(|_| Error::syntax(lstart, "attribute name is not UTF-8"))?;
    let rest = &line[colon + 1..];
    let spec = if let Some(b64) = rest.strip_prefix(b":") {
        Spec::Base64(trim_fill(b64))
    } else if let Some(url) = rest.strip_prefix(b"<") {
        Spec::Url(trim_fill(url))
    } else {
        Spec::Raw(rest.strip_prefix(b" ").unwrap_or(rest))
    };
    Ok((name.to_string(), spec))
}

fn trim_fill(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|&&b| b == b' ').count();
    &bytes[skip..]
}

fn resolve(spec: Spec<'_>, lstart: u64) -> Result<Vec<u8>> {
    match spec {
        Spec::Raw(v) => Ok(v.to_vec()),
        Spec::Base64(v) => value::decode_base64(v, lstart),
        Spec::Url(v) => {
            let url = std::str::from_utf8(v)
                .map_err(|_| Error::encoding(lstart, "URL is not UTF-8"))?;
            value::read_file_url(url, lstart)
        }
    }
}

fn resolve_text(spec: Spec<'_>, lstart: u64) -> Result<String> {
    String::from_utf8(resolve(spec, lstart)?)
        .map_err(|_| Error::syntax(lstart, "value is not UTF-8"))
}

/** Write the `version: 1` stream header. */
pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(b"version: 1\n")
}

/**
 * Write one entry record, preceded by a blank line.  Values that are
 * unsafe under the options' readability policy fall back to base64,
 * and logical lines longer than 76 bytes are folded when the options
 * ask for it.  Keys other than the default `add` classification are
 * recorded on an `ldapvi-key` line.
 */
pub fn write_entry<W: Write>(
    out: &mut W,
    key: &RecordKey,
    entry: &Entry,
    opts: &PrinterOptions,
) -> io::Result<()> {
    out.write_all(b"\n")?;
    write_attr_line(out, "dn", entry.dn().as_str().as_bytes(), opts)?;
    if !matches!(key, RecordKey::Add) {
        write_attr_line(out, "ldapvi-key", key.to_string().as_bytes(), opts)?;
    }
    for attr in entry.attributes() {
        for value in attr.values() {
            write_attr_line(out, attr.description(), value, opts)?;
        }
    }
    Ok(())
}

/** Write a `changetype: modify` record, preceded by a blank line. */
pub fn write_modify<W: Write>(
    out: &mut W,
    dn: &Dn,
    mods: &[Mod],
    opts: &PrinterOptions,
) -> io::Result<()> {
    out.write_all(b"\n")?;
    write_attr_line(out, "dn", dn.as_str().as_bytes(), opts)?;
    write_attr_line(out, "changetype", b"modify", opts)?;
    for m in mods {
        write_attr_line(out, m.op.token(), m.attribute.as_bytes(), opts)?;
        for value in &m.values {
            write_attr_line(out, &m.attribute, value, opts)?;
        }
        out.write_all(b"-\n")?;
    }
    Ok(())
}

/**
 * Write a `changetype: modrdn` record, preceded by a blank line.  The
 * printed `newrdn` and `newsuperior` are derived from `new`, the
 * superior only when it is non-empty.
 */
pub fn write_rename<W: Write>(
    out: &mut W,
    old: &Dn,
    new: &Dn,
    delete_old_rdn: bool,
    opts: &PrinterOptions,
) -> io::Result<()> {
    out.write_all(b"\n")?;
    write_attr_line(out, "dn", old.as_str().as_bytes(), opts)?;
    write_attr_line(out, "changetype", b"modrdn", opts)?;
    write_attr_line(out, "newrdn", new.rdn().as_bytes(), opts)?;
    let flag = if delete_old_rdn { "1" } else { "0" };
    write_attr_line(out, "deleteoldrdn", flag.as_bytes(), opts)?;
    let parent = new.parent();
    if !parent.is_empty() {
        write_attr_line(out, "newsuperior", parent.as_bytes(), opts)?;
    }
    Ok(())
}

/** Write a `changetype: delete` record, preceded by a blank line. */
pub fn write_delete<W: Write>(
    out: &mut W,
    dn: &Dn,
    opts: &PrinterOptions,
) -> io::Result<()> {
    out.write_all(b"\n")?;
    write_attr_line(out, "dn", dn.as_str().as_bytes(), opts)?;
    write_attr_line(out, "changetype", b"delete", opts)
}

fn write_attr_line<W: Write>(
    out: &mut W,
    name: &str,
    value: &[u8],
    opts: &PrinterOptions,
) -> io::Result<()> {
    let mut line = Vec::with_capacity(name.len() + value.len() + 4);
    line.extend_from_slice(name.as_bytes());
    if value::is_safe(value, opts.readability) {
        line.extend_from_slice(b": ");
        line.extend_from_slice(value);
    } else {
        line.extend_from_slice(b":: ");
        line.extend_from_slice(value::encode_base64(value).as_bytes());
    }
    write_folded(out, &line, opts.fold)
}

/*
 * Continuation lines start with a space, so each carries one byte less
 * than the fold width.
 */
fn write_folded<W: Write>(
    out: &mut W,
    line: &[u8],
    fold: bool,
) -> io::Result<()> {
    if !fold || line.len() <= WRAP {
        out.write_all(line)?;
        return out.write_all(b"\n");
    }
    out.write_all(&line[..WRAP])?;
    let mut rest = &line[WRAP..];
    while !rest.is_empty() {
        out.write_all(b"\n ")?;
        let n = rest.len().min(WRAP - 1);
        out.write_all(&rest[..n])?;
        rest = &rest[n..];
    }
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Cursor;

    fn parse_one(input: &str) -> Record {
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        LdifParser
            .read_entry(&mut stream, None)
            .expect("parse")
            .expect("one record")
    }

    #[test]
    fn entry_record() {
        let record = parse_one(indoc! {"
            # a comment before the record
            dn: cn=a,dc=example,dc=com
            objectClass: person
            cn: a
            sn:: Yg==
        "});
        assert_eq!(record.key, RecordKey::Add);
        assert_eq!(record.entry.dn().as_str(), "cn=a,dc=example,dc=com");
        assert_eq!(record.entry.attribute("sn").unwrap().values()[0], b"b");
        /* The comment is part of the preamble, not the record. */
        assert_eq!(record.pos, 30);
    }

    #[test]
    fn folded_lines() {
        let record = parse_one(
            "dn: cn=a,dc=exa\n mple,dc=com\ndescription: one \n two\n",
        );
        assert_eq!(record.entry.dn().as_str(), "cn=a,dc=example,dc=com");
        assert_eq!(
            record.entry.attribute("description").unwrap().values()[0],
            b"one two"
        );
    }

    #[test]
    fn keys_and_version() {
        let mut stream = Cursor::new(
            &b"version: 1\n\ndn: dc=a\nldapvi-key: 12\ndc: a\n"[..],
        );
        let record = LdifParser.read_entry(&mut stream, None).unwrap().unwrap();
        assert_eq!(record.key, RecordKey::Index(12));
        /* The key line does not become an attribute. */
        assert!(record.entry.attribute("ldapvi-key").is_none());
        assert_eq!(record.pos, 12);

        let mut stream = Cursor::new(&b"version: 3\n\ndn: dc=a\n"[..]);
        assert!(matches!(
            LdifParser.read_entry(&mut stream, None),
            Err(Error::Version { pos: 0, .. })
        ));
    }

    #[test]
    fn bad_records() {
        let parser = LdifParser;

        /* Something other than dn first. */
        let mut stream = Cursor::new(&b"cn: a\n"[..]);
        assert!(matches!(
            parser.read_entry(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* A DN must look like one. */
        let mut stream = Cursor::new(&b"dn: nonsense\n"[..]);
        assert!(matches!(
            parser.read_entry(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* Attribute line without a colon. */
        let mut stream = Cursor::new(&b"dn: dc=a\nbroken line\n"[..]);
        assert!(matches!(
            parser.read_entry(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* Controls are declined. */
        let mut stream =
            Cursor::new(&b"dn: dc=a\ncontrol: 1.2.3.4 true\n"[..]);
        assert!(matches!(
            parser.read_entry(&mut stream, None),
            Err(Error::NotSupported { .. })
        ));

        /* A stray separator line. */
        let mut stream = Cursor::new(&b"dn: dc=a\n-\n"[..]);
        assert!(matches!(
            parser.read_entry(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* changetype must come before the attributes. */
        let mut stream =
            Cursor::new(&b"dn: dc=a\ndc: a\nchangetype: add\n"[..]);
        assert!(matches!(
            parser.read_entry(&mut stream, None),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn delete_record() {
        let mut stream =
            Cursor::new(&b"dn: dc=a\nchangetype: delete\n"[..]);
        let record = LdifParser.read_delete(&mut stream, None).unwrap();
        assert_eq!(record.dn.as_str(), "dc=a");

        let mut stream =
            Cursor::new(&b"dn: dc=a\nchangetype: delete\ndc: a\n"[..]);
        assert!(matches!(
            LdifParser.read_delete(&mut stream, None),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn modify_record() {
        let input = indoc! {"
            dn: cn=a,dc=b
            changetype: modify
            add: description
            description: first
            description: second
            -
            delete: seeAlso
            -
            replace: sn
            -
        "};
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        let record = LdifParser.read_modify(&mut stream, None).unwrap();
        assert_eq!(record.mods.len(), 3);
        assert_eq!(record.mods[0].op, ModOp::Add);
        assert_eq!(record.mods[0].attribute, "description");
        assert_eq!(record.mods[0].values.len(), 2);
        assert!(record.mods[1].values.is_empty());
        /* LDIF permits an empty replace. */
        assert_eq!(record.mods[2].op, ModOp::Replace);
        assert!(record.mods[2].values.is_empty());

        /* Value lines must repeat the block's attribute. */
        let input = "dn: cn=a,dc=b\nchangetype: modify\nadd: description\nsn: x\n-\n";
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        assert!(matches!(
            LdifParser.read_modify(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* An unterminated block. */
        let input = "dn: cn=a,dc=b\nchangetype: modify\nadd: description\ndescription: x\n";
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        assert!(matches!(
            LdifParser.read_modify(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* An empty add. */
        let input = "dn: cn=a,dc=b\nchangetype: modify\nadd: description\n-\n";
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        assert!(matches!(
            LdifParser.read_modify(&mut stream, None),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn rename_record() {
        let input = indoc! {"
            dn: cn=old,dc=x,dc=y
            changetype: modrdn
            newrdn: cn=new
            deleteoldrdn: 0
        "};
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        let record = LdifParser.read_rename(&mut stream, None).unwrap();
        assert_eq!(record.old.as_str(), "cn=old,dc=x,dc=y");
        assert_eq!(record.new.as_str(), "cn=new,dc=x,dc=y");
        assert!(!record.delete_old_rdn);

        let input = indoc! {"
            dn: cn=old,dc=x,dc=y
            changetype: moddn
            newrdn: cn=new
            deleteoldrdn: 1
            newsuperior: o=elsewhere
        "};
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        let record = LdifParser.read_rename(&mut stream, None).unwrap();
        assert_eq!(record.new.as_str(), "cn=new,o=elsewhere");
        assert!(record.delete_old_rdn);

        /* Out-of-range deleteoldrdn. */
        let input = "dn: cn=a,dc=b\nchangetype: modrdn\nnewrdn: cn=z\ndeleteoldrdn: 2\n";
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        assert!(matches!(
            LdifParser.read_rename(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* Missing deleteoldrdn. */
        let input = "dn: cn=a,dc=b\nchangetype: modrdn\nnewrdn: cn=z\n";
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        assert!(matches!(
            LdifParser.read_rename(&mut stream, None),
            Err(Error::Syntax { .. })
        ));

        /* Trailing attributes are rejected. */
        let input = "dn: cn=a,dc=b\nchangetype: modrdn\nnewrdn: cn=z\ndeleteoldrdn: 0\ncn: z\n";
        let mut stream = Cursor::new(input.as_bytes().to_vec());
        assert!(matches!(
            LdifParser.read_rename(&mut stream, None),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn print_parse_round_trip() {
        let mut entry = Entry::new("cn=a,dc=example,dc=com");
        entry.push_value("cn", "a");
        entry.push_value("description", "two\nlines");
        entry.push_value("jpegPhoto", vec![0u8, 1, 2, 255]);
        entry.push_value("seeAlso", "x".repeat(200));

        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        write_entry(
            &mut out,
            &RecordKey::Index(0),
            &entry,
            &PrinterOptions::default(),
        )
        .unwrap();

        /* The long value was folded. */
        assert!(out.split(|&b| b == b'\n').all(|l| l.len() <= WRAP));

        let mut stream = Cursor::new(out);
        let record = LdifParser.read_entry(&mut stream, None).unwrap().unwrap();
        assert_eq!(record.key, RecordKey::Index(0));
        assert_eq!(record.entry, entry);
    }

    #[test]
    fn print_rename_round_trip() {
        let mut out = Vec::new();
        write_rename(
            &mut out,
            &Dn::from("cn=old,dc=x,dc=y"),
            &Dn::from("cn=new,dc=x,dc=y"),
            true,
            &PrinterOptions::default(),
        )
        .unwrap();
        let record = LdifParser
            .read_rename(&mut Cursor::new(out), None)
            .unwrap();
        assert_eq!(record.old.as_str(), "cn=old,dc=x,dc=y");
        assert_eq!(record.new.as_str(), "cn=new,dc=x,dc=y");
        assert!(record.delete_old_rdn);
    }

    #[test]
    fn print_modify_round_trip() {
        let mods = vec![
            Mod {
                op: ModOp::Replace,
                attribute: "sn".to_string(),
                values: vec![b"new".to_vec(), vec![0u8, 7]],
            },
            Mod {
                op: ModOp::Delete,
                attribute: "seeAlso".to_string(),
                values: vec![],
            },
        ];
        let mut out = Vec::new();
        write_modify(
            &mut out,
            &Dn::from("cn=a,dc=b"),
            &mods,
            &PrinterOptions::default(),
        )
        .unwrap();
        let record = LdifParser
            .read_modify(&mut Cursor::new(out), None)
            .unwrap();
        assert_eq!(record.dn.as_str(), "cn=a,dc=b");
        assert_eq!(record.mods, mods);
    }
}
