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
 * The stream diff engine.
 *
 * [`compare_streams`] walks an edited *data* stream record by record
 * and reconciles it against the *clean* stream the editor originally
 * wrote, reporting the minimum set of directory operations to a
 * [`ChangeHandler`].  Records are matched up by the numeric keys the
 * printer embedded in the clean file, so the user may reorder and
 * delete freely; records keyed with a change keyword are dispatched to
 * the handler directly.
 *
 * For each numeric key the engine first byte-compares the record
 * against the clean bytes at the offset the caller supplies; only when
 * that fast path fails are the two records parsed and structurally
 * diffed, attribute by attribute.  Clean entries whose keys never
 * appear in the data stream are reported as deletions once the data
 * stream is exhausted, in ascending key order.
 */

use crate::dn::Dn;
use crate::entry::{Entry, Mod, ModOp};
use crate::error::{Error, Result};
use crate::parser::{Parser, RecordKey};
use std::io::{BufRead, ErrorKind, Read, Seek, SeekFrom};

// ============================================================================
// Handler interface
// ============================================================================

/// Returned by a handler to stop the comparison.
///
/// The engine surfaces it to the caller as [`Error::Aborted`] after
/// restoring the offsets array.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Aborted;

/// What every [`ChangeHandler`] method returns.
pub type HandlerResult = std::result::Result<(), Aborted>;

impl From<Aborted> for Error {
    fn from(_: Aborted) -> Self {
        Error::Aborted
    }
}

/// The consumer of a comparison run.
///
/// `key` is the clean-file key of the record that produced the call,
/// or [`None`] for an immediate record keyed with a change keyword.
/// Mod lists are handed over by value.
pub trait ChangeHandler {
    /// A new entry is to be created.
    fn handle_add(
        &mut self,
        key: Option<usize>,
        dn: &Dn,
        mods: Vec<Mod>,
    ) -> HandlerResult;

    /// An entry is to be deleted.
    fn handle_delete(&mut self, key: Option<usize>, dn: &Dn) -> HandlerResult;

    /// An entry's attributes are to be modified.
    fn handle_change(
        &mut self,
        key: Option<usize>,
        old: &Dn,
        new: &Dn,
        mods: Vec<Mod>,
    ) -> HandlerResult;

    /// An entry was renamed in place; `entry` is its complete edited
    /// state under the new name.
    fn handle_rename(
        &mut self,
        key: Option<usize>,
        old: &Dn,
        entry: Entry,
    ) -> HandlerResult;

    /// An explicit `rename` record.
    fn handle_rename_immediate(
        &mut self,
        old: &Dn,
        new: &Dn,
        delete_old_rdn: bool,
    ) -> HandlerResult;
}

// ============================================================================
// Offset marking
// ============================================================================

/*
 * Consumed clean offsets are marked in place.  The transform is its own
 * inverse and maps every offset >= 0 to a value <= -2, so restoring is
 * one sweep over the negative entries and -1 can never be confused
 * with either form.
 */
pub(crate) const fn mark(offset: i64) -> i64 {
    -(offset + 2)
}

// ============================================================================
// Comparison
// ============================================================================

/**
 * Compare `data` against `clean` and report every difference to
 * `handler`.
 *
 * `offsets[k]` is the byte offset in `clean` of the record with
 * numeric key `k`.  The array is scribbled on during the run and
 * restored to its original contents on every return path.  Both
 * streams are parsed with `parser`, so the two files must share one
 * dialect.
 *
 * # Errors
 *
 * Input errors from either stream carry a byte position; a duplicate
 * or out-of-range numeric key is [`Error::Key`]; a handler refusal is
 * [`Error::Aborted`].  The first error aborts the run.
 */
pub fn compare_streams<P, C, D, H>(
    parser: &P,
    clean: &mut C,
    data: &mut D,
    offsets: &mut [i64],
    handler: &mut H,
) -> Result<()>
where
    P: Parser,
    C: BufRead + Seek,
    D: BufRead + Seek,
    H: ChangeHandler,
{
    let result = run_compare(parser, clean, data, offsets, handler);
    for offset in offsets.iter_mut() {
        if *offset < 0 {
            *offset = mark(*offset);
        }
    }
    result
}

fn run_compare<P, C, D, H>(
    parser: &P,
    clean: &mut C,
    data: &mut D,
    offsets: &mut [i64],
    handler: &mut H,
) -> Result<()>
where
    P: Parser,
    C: BufRead + Seek,
    D: BufRead + Seek,
    H: ChangeHandler,
{
    while let Some((key, pos)) = parser.peek_entry(data, None)? {
        match key {
            RecordKey::Index(k) => {
                compare_keyed(parser, clean, data, offsets, handler, k, pos)?;
            }
            RecordKey::Add => {
                let record = read_data_entry(parser, data, pos)?;
                let mods = record.entry.to_mods();
                handler.handle_add(None, record.entry.dn(), mods)?;
            }
            RecordKey::Token(token) if token == "replace" => {
                let record = read_data_entry(parser, data, pos)?;
                let mods = record.entry.to_mods();
                let dn = record.entry.dn();
                handler.handle_change(None, dn, dn, mods)?;
            }
            RecordKey::Delete => {
                let record = parser.read_delete(data, None)?;
                handler.handle_delete(None, &record.dn)?;
            }
            RecordKey::Modify => {
                let record = parser.read_modify(data, None)?;
                handler.handle_change(
                    None,
                    &record.dn,
                    &record.dn,
                    record.mods,
                )?;
            }
            RecordKey::Rename => {
                let record = parser.read_rename(data, None)?;
                handler.handle_rename_immediate(
                    &record.old,
                    &record.new,
                    record.delete_old_rdn,
                )?;
            }
            RecordKey::Token(token) => {
                return Err(Error::Key { pos, key: token });
            }
        }
    }

    /* Clean entries never touched by the data stream were deleted. */
    for k in 0..offsets.len() {
        if offsets[k] < 0 {
            continue;
        }
        let record = parser
            .read_entry(clean, Some(offsets[k] as u64))?
            .ok_or_else(|| {
                Error::syntax(offsets[k] as u64, "no record at clean offset")
            })?;
        handler.handle_delete(Some(k), record.entry.dn())?;
    }
    Ok(())
}

/*
 * One numeric-key data record: byte-compare against the clean record
 * first, parse and structurally diff only on mismatch.
 */
fn compare_keyed<P, C, D, H>(
    parser: &P,
    clean: &mut C,
    data: &mut D,
    offsets: &mut [i64],
    handler: &mut H,
    k: usize,
    pos: u64,
) -> Result<()>
where
    P: Parser,
    C: BufRead + Seek,
    D: BufRead + Seek,
    H: ChangeHandler,
{
    if k >= offsets.len() || offsets[k] < 0 {
        return Err(Error::Key { pos, key: k.to_string() });
    }
    let start = offsets[k] as u64;

    parser.skip_entry(clean, Some(start))?.ok_or_else(|| {
        Error::syntax(start, "no record at clean offset")
    })?;
    let len = clean.stream_position()? - start;

    if bytes_equal(clean, data, start, pos, len)? {
        data.seek(SeekFrom::Start(pos + len))?;
        offsets[k] = mark(offsets[k]);
        return Ok(());
    }

    /*
     * Slow path.  Positions are restored on failure so the caller can
     * report the error and leave the streams usable.
     */
    let clean_save = clean.stream_position()?;
    let data_save = data.stream_position()?;
    let outcome = (|| -> Result<()> {
        let crec = parser.read_entry(clean, Some(start))?.ok_or_else(|| {
            Error::syntax(start, "no record at clean offset")
        })?;
        let drec = read_data_entry(parser, data, pos)?;
        if crec.entry.dn() != drec.entry.dn() {
            validate_rename(&crec.entry, &drec.entry)?;
            handler.handle_rename(Some(k), crec.entry.dn(), drec.entry)?;
        } else {
            let mods = diff_attributes(&crec.entry, &drec.entry);
            if !mods.is_empty() {
                handler.handle_change(
                    Some(k),
                    crec.entry.dn(),
                    drec.entry.dn(),
                    mods,
                )?;
            }
        }
        offsets[k] = mark(offsets[k]);
        Ok(())
    })();
    if outcome.is_err() {
        clean.seek(SeekFrom::Start(clean_save))?;
        data.seek(SeekFrom::Start(data_save))?;
    }
    outcome
}

fn read_data_entry<P: Parser, S: BufRead + Seek>(
    parser: &P,
    data: &mut S,
    pos: u64,
) -> Result<crate::parser::Record> {
    parser
        .read_entry(data, None)?
        .ok_or_else(|| Error::syntax(pos, "unexpected end of stream"))
}

/*
 * Byte-compare a window of each stream.  Both stream positions are
 * restored no matter what; a short read on either side compares
 * unequal rather than failing.
 */
fn bytes_equal<A, B>(
    a: &mut A,
    b: &mut B,
    apos: u64,
    bpos: u64,
    len: u64,
) -> Result<bool>
where
    A: Read + Seek,
    B: Read + Seek,
{
    let a_save = a.stream_position()?;
    let b_save = b.stream_position()?;
    let result = window_equal(a, b, apos, bpos, len);
    a.seek(SeekFrom::Start(a_save))?;
    b.seek(SeekFrom::Start(b_save))?;
    result
}

fn window_equal<A, B>(
    a: &mut A,
    b: &mut B,
    apos: u64,
    bpos: u64,
    len: u64,
) -> Result<bool>
where
    A: Read + Seek,
    B: Read + Seek,
{
    a.seek(SeekFrom::Start(apos))?;
    b.seek(SeekFrom::Start(bpos))?;
    let mut abuf = [0u8; 4096];
    let mut bbuf = [0u8; 4096];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(4096) as usize;
        if !fill(a, &mut abuf[..n])? || !fill(b, &mut bbuf[..n])? {
            return Ok(false);
        }
        if abuf[..n] != bbuf[..n] {
            return Ok(false);
        }
        remaining -= n as u64;
    }
    Ok(true)
}

/* read_exact, with a clean end-of-stream reported as false. */
fn fill<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<bool> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Structural diff
// ============================================================================

/**
 * The modifications turning `clean`'s attributes into `data`'s.
 *
 * Attributes only in `data` become an `Add` of all their values;
 * attributes only in `clean` a bare `Delete`.  For attributes on both
 * sides the value multisets are differenced byte-exactly, and the
 * engine emits a single `Replace` carrying `data`'s values whenever
 * that is strictly cheaper, that is when `|added| + |removed| >
 * |data values|`; otherwise the non-empty halves of the `Add`/`Delete`
 * pair.  The entries' names play no part here.
 */
#[must_use]
pub fn diff_attributes(clean: &Entry, data: &Entry) -> Vec<Mod> {
    let mut mods = Vec::new();
    for cattr in clean.attributes() {
        match data.attribute(cattr.description()) {
            None => mods.push(Mod {
                op: ModOp::Delete,
                attribute: cattr.description().to_string(),
                values: Vec::new(),
            }),
            Some(dattr) => {
                diff_values(cattr.values(), dattr, &mut mods);
            }
        }
    }
    for dattr in data.attributes() {
        if clean.attribute(dattr.description()).is_none() {
            mods.push(dattr.to_mod(ModOp::Add));
        }
    }
    mods
}

fn diff_values(
    cvalues: &[Vec<u8>],
    dattr: &crate::entry::Attribute,
    mods: &mut Vec<Mod>,
) {
    let dvalues = dattr.values();
    let mut matched = vec![false; dvalues.len()];
    let mut removed: Vec<Vec<u8>> = Vec::new();
    for cv in cvalues {
        let mut found = false;
        for (i, dv) in dvalues.iter().enumerate() {
            if !matched[i] && cv == dv {
                matched[i] = true;
                found = true;
                break;
            }
        }
        if !found {
            removed.push(cv.clone());
        }
    }
    let added: Vec<Vec<u8>> = dvalues
        .iter()
        .enumerate()
        .filter(|(i, _)| !matched[*i])
        .map(|(_, v)| v.clone())
        .collect();

    if added.is_empty() && removed.is_empty() {
        return;
    }
    if added.len() + removed.len() > dvalues.len() {
        mods.push(dattr.to_mod(ModOp::Replace));
        return;
    }
    if !added.is_empty() {
        mods.push(Mod {
            op: ModOp::Add,
            attribute: dattr.description().to_string(),
            values: added,
        });
    }
    if !removed.is_empty() {
        mods.push(Mod {
            op: ModOp::Delete,
            attribute: dattr.description().to_string(),
            values: removed,
        });
    }
}

// ============================================================================
// Rename validation
// ============================================================================

/**
 * Check that `data` is a legal in-place rename of `clean` and derive
 * `deleteoldrdn`: false when `data` still carries `clean`'s RDN value
 * in the same attribute, true when it does not.
 *
 * # Errors
 *
 * [`Error::Rename`] when either name is empty, when `clean`'s leftmost
 * RDN is not an `attr=value` assertion, or when `clean` does not hold
 * its own RDN value among that attribute's values.
 */
pub fn validate_rename(clean: &Entry, data: &Entry) -> Result<bool> {
    if clean.dn().is_root() || data.dn().is_root() {
        return Err(rename_error(clean, "empty distinguished name"));
    }
    let Some((attr, value)) = clean.dn().rdn_assertion() else {
        return Err(rename_error(clean, "malformed relative name"));
    };
    let holds = clean
        .attribute(attr)
        .map(|a| a.contains(&value))
        .unwrap_or(false);
    if !holds {
        return Err(rename_error(
            clean,
            format!("entry does not contain its {attr} value"),
        ));
    }
    let keeps = data
        .attribute(attr)
        .map(|a| a.contains(&value))
        .unwrap_or(false);
    Ok(!keeps)
}

fn rename_error(entry: &Entry, reason: impl Into<String>) -> Error {
    Error::Rename {
        dn: entry.dn().as_str().to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dn: &str, attrs: &[(&str, &[&str])]) -> Entry {
        let mut e = Entry::new(dn);
        for (name, values) in attrs {
            for v in *values {
                e.push_value(name, *v);
            }
        }
        e
    }

    #[test]
    fn mark_involution() {
        for offset in [0i64, 1, 2, 57, i64::MAX / 2] {
            let marked = mark(offset);
            assert!(marked <= -2);
            assert_eq!(mark(marked), offset);
            /* No offset is its own mark. */
            assert_ne!(marked, offset);
        }
    }

    #[test]
    fn diff_equal_entries() {
        let a = entry("dc=a", &[("cn", &["x", "y"])]);
        let mut b = entry("dc=a", &[("CN", &["y"])]);
        b.push_value("cn", "x");
        assert!(diff_attributes(&a, &b).is_empty());
    }

    #[test]
    fn diff_added_and_deleted_attributes() {
        let c = entry("dc=a", &[("sn", &["x"]), ("mail", &["m"])]);
        let d = entry("dc=a", &[("sn", &["x"]), ("tel", &["1", "2"])]);
        let mods = diff_attributes(&c, &d);
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[0].op, ModOp::Delete);
        assert_eq!(mods[0].attribute, "mail");
        assert!(mods[0].values.is_empty());
        assert_eq!(mods[1].op, ModOp::Add);
        assert_eq!(mods[1].attribute, "tel");
        assert_eq!(mods[1].values.len(), 2);
    }

    #[test]
    fn diff_replace_when_cheaper() {
        /* One value swapped for another: replace wins. */
        let c = entry("dc=a", &[("sn", &["old"])]);
        let d = entry("dc=a", &[("sn", &["new"])]);
        let mods = diff_attributes(&c, &d);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].op, ModOp::Replace);
        assert_eq!(mods[0].values, vec![b"new".to_vec()]);

        /* A pure addition stays an add. */
        let c = entry("dc=a", &[("cn", &["x"])]);
        let d = entry("dc=a", &[("cn", &["x", "y"])]);
        let mods = diff_attributes(&c, &d);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].op, ModOp::Add);
        assert_eq!(mods[0].values, vec![b"y".to_vec()]);

        /* A small edit of a large set keeps the precise pair. */
        let c = entry("dc=a", &[("cn", &["a", "b", "c"])]);
        let d = entry("dc=a", &[("cn", &["a", "b", "z"])]);
        let mods = diff_attributes(&c, &d);
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[0].op, ModOp::Add);
        assert_eq!(mods[0].values, vec![b"z".to_vec()]);
        assert_eq!(mods[1].op, ModOp::Delete);
        assert_eq!(mods[1].values, vec![b"c".to_vec()]);
    }

    #[test]
    fn diff_duplicate_values() {
        /* Multisets, not sets: a lost duplicate is a removal. */
        let c = entry("dc=a", &[("cn", &["x", "x"])]);
        let d = entry("dc=a", &[("cn", &["x"])]);
        let mods = diff_attributes(&c, &d);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].op, ModOp::Delete);
        assert_eq!(mods[0].values, vec![b"x".to_vec()]);
    }

    #[test]
    fn rename_validation() {
        let c = entry("cn=old,dc=a", &[("cn", &["old"]), ("sn", &["s"])]);
        let d = entry("cn=new,dc=a", &[("cn", &["new"]), ("sn", &["s"])]);
        assert!(validate_rename(&c, &d).unwrap());

        /* New entry retains the old value: keep the old RDN. */
        let d = entry("cn=new,dc=a", &[("cn", &["new", "old"])]);
        assert!(!validate_rename(&c, &d).unwrap());

        /* Clean entry without its own RDN value. */
        let broken = entry("cn=old,dc=a", &[("cn", &["other"])]);
        assert!(matches!(
            validate_rename(&broken, &d),
            Err(Error::Rename { .. })
        ));

        /* Escaped RDN values compare unescaped. */
        let c = entry("cn=a\\, b,dc=a", &[("cn", &["a, b"])]);
        let d = entry("cn=z,dc=a", &[("cn", &["z"])]);
        assert!(validate_rename(&c, &d).unwrap());

        let root = entry("", &[]);
        assert!(matches!(
            validate_rename(&root, &d),
            Err(Error::Rename { .. })
        ));
    }
}
