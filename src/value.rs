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
 * Attribute value codecs and the printers' binary-safety policy.
 *
 * Values are arbitrary byte buffers.  When printing, each value is
 * classified by [`is_safe`]: a safe value can appear verbatim on an
 * attribute line, anything else is routed through an alternate encoding
 * (base64, or the extended dialect's backslash escapes).  What counts as
 * readable is configurable through [`Readability`], carried in
 * [`PrinterOptions`] by every printing call.
 */

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;

/** How much of the byte space the printers will emit verbatim. */
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Readability {
    /** Printable ASCII only. */
    Ascii,
    /** Well-formed UTF-8 without control characters. */
    #[default]
    Utf8,
    /** Anything that does not break the record structure. */
    Any,
}

/** Options threaded through every printing call. */
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PrinterOptions {
    /** Readability policy for verbatim values. */
    pub readability: Readability,
    /** Fold long LDIF lines at 76 bytes.  Ignored by the extended
     * dialect, which never folds. */
    pub fold: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        PrinterOptions { readability: Readability::Utf8, fold: true }
    }
}

/**
 * Whether a value may be printed verbatim on an attribute line: it must
 * contain no NUL, LF, or CR, must not begin with a space or a colon, and
 * must satisfy the readability policy.
 */
#[must_use]
pub fn is_safe(value: &[u8], readability: Readability) -> bool {
    if value.iter().any(|&b| b == 0 || b == b'\n' || b == b'\r') {
        return false;
    }
    if let Some(&first) = value.first() {
        if first == b' ' || first == b':' {
            return false;
        }
    }
    match readability {
        Readability::Ascii => {
            value.iter().all(|&b| (0x20..=0x7e).contains(&b))
        }
        Readability::Utf8 => match std::str::from_utf8(value) {
            Ok(s) => s.chars().all(|c| c >= ' ' && c != '\u{7f}'),
            Err(_) => false,
        },
        Readability::Any => true,
    }
}

/** Encode bytes as standard base64 with padding. */
#[must_use]
pub fn encode_base64(value: &[u8]) -> String {
    STANDARD.encode(value)
}

/**
 * Decode standard base64.  `pos` locates the value in the input for
 * error reporting; any byte outside the alphabet is an error.
 */
pub fn decode_base64(text: &[u8], pos: u64) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| Error::encoding(pos, format!("invalid base64: {e}")))
}

/**
 * Resolve a `file://` URL to the raw contents of the named file.  Any
 * other scheme, and any read failure, is an encoding error at `pos`.
 */
pub fn read_file_url(url: &str, pos: u64) -> Result<Vec<u8>> {
    let Some(path) = url.strip_prefix("file://") else {
        return Err(Error::encoding(
            pos,
            format!("unsupported URL scheme in {url:?}"),
        ));
    };
    fs::read(path)
        .map_err(|e| Error::encoding(pos, format!("cannot read {path}: {e}")))
}
