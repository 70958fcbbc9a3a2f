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
 * The password-hash gateway.
 *
 * The extended dialect lets an editor write `userPassword:ssha secret`
 * and have the plaintext hashed on the way in.  Hashing itself is
 * injected through the [`PasswordEncoder`] trait; the parser only
 * verifies that whatever comes back starts with the RFC 2307 prefix for
 * the requested [`Scheme`].
 *
 * [`DigestPasswords`] is the bundled encoder, a thin wrapper over the
 * [`digest`] crate and the RustCrypto hashes.  The salted schemes need a
 * salt supplied at construction; the crypt schemes are refused, as there
 * is no crypt(3) binding here.
 *
 * [`digest`]: https://docs.rs/digest/latest/digest/
 */

use crate::value::encode_base64;
use std::fmt;
use thiserror::Error;

/**
 * A type alias for the result of [`PasswordEncoder`] calls, with
 * [`PasswordError`] returned in [`Err`] variants.
 */
pub type PasswordResult<T> = std::result::Result<T, PasswordError>;

/** Errors from a password encoder. */
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    /** The encoder does not implement this scheme. */
    #[error("password scheme {0} is not supported")]
    Unsupported(Scheme),

    /** A salted scheme was requested but no salt is available. */
    #[error("password scheme {0} requires a salt")]
    MissingSalt(Scheme),
}

/** The password hash schemes the editor dialect knows about. */
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scheme {
    /** Plain SHA1, `{SHA}`. */
    Sha,
    /** Salted SHA1, `{SSHA}`. */
    Ssha,
    /** Plain MD5, `{MD5}`. */
    Md5,
    /** Salted MD5, `{SMD5}`. */
    Smd5,
    /** Unix crypt(3), `{CRYPT}`. */
    Crypt,
    /** MD5-based crypt(3), also `{CRYPT}`. */
    CryptMd5,
}

impl Scheme {
    /** Every scheme, in parse-token order. */
    pub const ALL: [Scheme; 6] = [
        Scheme::Sha,
        Scheme::Ssha,
        Scheme::Md5,
        Scheme::Smd5,
        Scheme::Crypt,
        Scheme::CryptMd5,
    ];

    /** The token naming this scheme in the extended dialect. */
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Scheme::Sha => "sha",
            Scheme::Ssha => "ssha",
            Scheme::Md5 => "md5",
            Scheme::Smd5 => "smd5",
            Scheme::Crypt => "crypt",
            Scheme::CryptMd5 => "cryptmd5",
        }
    }

    /**
     * The RFC 2307 prefix a conforming encoder must produce.  Both crypt
     * variants share `{CRYPT}`.
     */
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Scheme::Sha => "{SHA}",
            Scheme::Ssha => "{SSHA}",
            Scheme::Md5 => "{MD5}",
            Scheme::Smd5 => "{SMD5}",
            Scheme::Crypt | Scheme::CryptMd5 => "{CRYPT}",
        }
    }

    /** Look up a scheme by its dialect token. */
    #[must_use]
    pub fn from_token(s: &str) -> Option<Scheme> {
        Scheme::ALL.into_iter().find(|scheme| scheme.token() == s)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/**
 * Turns a plaintext password into prefixed hash bytes.  Implementations
 * must return values beginning with [`Scheme::prefix`]; the parser
 * checks and rejects anything else.
 */
pub trait PasswordEncoder {
    /**
     * Hash `plaintext` under `scheme`.
     *
     * # Errors
     *
     * Returns an error if the scheme is not implemented or the encoder
     * is missing material it needs, such as a salt.
     */
    fn encode(&self, scheme: Scheme, plaintext: &[u8])
    -> PasswordResult<Vec<u8>>;
}

/**
 * The bundled [`PasswordEncoder`] over the RustCrypto hashes.
 *
 * `{SHA}` and `{MD5}` are the base64 of the raw digest.  `{SSHA}` and
 * `{SMD5}` are the base64 of `digest(password ++ salt) ++ salt` and are
 * only available when a salt was supplied via [`with_salt`]; salt
 * generation is deliberately left to the caller.  The crypt schemes are
 * always refused.
 *
 * [`with_salt`]: DigestPasswords::with_salt
 */
#[derive(Clone, Debug, Default)]
pub struct DigestPasswords {
    salt: Option<Vec<u8>>,
}

impl DigestPasswords {
    /** An encoder for the unsalted schemes only. */
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /** An encoder that salts `{SSHA}` and `{SMD5}` with `salt`. */
    pub fn with_salt(salt: impl Into<Vec<u8>>) -> Self {
        DigestPasswords { salt: Some(salt.into()) }
    }

    fn salt_for(&self, scheme: Scheme) -> PasswordResult<&[u8]> {
        match &self.salt {
            Some(salt) => Ok(salt),
            None => Err(PasswordError::MissingSalt(scheme)),
        }
    }
}

fn prefixed(prefix: &str, binary: &[u8]) -> Vec<u8> {
    let mut out = Vec::from(prefix.as_bytes());
    out.extend_from_slice(encode_base64(binary).as_bytes());
    out
}

fn plain_hash<D: digest::Digest>(prefix: &str, plaintext: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(plaintext);
    prefixed(prefix, &hasher.finalize())
}

/*
 * digest(password ++ salt) ++ salt, so a verifier can recover the salt
 * from the stored value.
 */
fn salted_hash<D: digest::Digest>(
    prefix: &str,
    plaintext: &[u8],
    salt: &[u8],
) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(plaintext);
    hasher.update(salt);
    let mut binary = hasher.finalize().to_vec();
    binary.extend_from_slice(salt);
    prefixed(prefix, &binary)
}

impl PasswordEncoder for DigestPasswords {
    fn encode(
        &self,
        scheme: Scheme,
        plaintext: &[u8],
    ) -> PasswordResult<Vec<u8>> {
        match scheme {
            Scheme::Sha => {
                Ok(plain_hash::<sha1::Sha1>(scheme.prefix(), plaintext))
            }
            Scheme::Md5 => {
                Ok(plain_hash::<md5::Md5>(scheme.prefix(), plaintext))
            }
            Scheme::Ssha => Ok(salted_hash::<sha1::Sha1>(
                scheme.prefix(),
                plaintext,
                self.salt_for(scheme)?,
            )),
            Scheme::Smd5 => Ok(salted_hash::<md5::Md5>(
                scheme.prefix(),
                plaintext,
                self.salt_for(scheme)?,
            )),
            Scheme::Crypt | Scheme::CryptMd5 => {
                Err(PasswordError::Unsupported(scheme))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::decode_base64;

    #[test]
    fn scheme_tokens() {
        for scheme in Scheme::ALL {
            assert_eq!(Scheme::from_token(scheme.token()), Some(scheme));
        }
        assert_eq!(Scheme::from_token("sha512"), None);
    }

    #[test]
    fn digest_sha() {
        let enc = DigestPasswords::new();
        let out = enc.encode(Scheme::Sha, b"secret").unwrap();
        let b64 = out.strip_prefix(b"{SHA}").expect("prefix");
        /* A SHA1 digest is 20 bytes. */
        assert_eq!(decode_base64(b64, 0).unwrap().len(), 20);

        /* Same input, same hash. */
        assert_eq!(out, enc.encode(Scheme::Sha, b"secret").unwrap());
        assert_ne!(out, enc.encode(Scheme::Sha, b"other").unwrap());
    }

    #[test]
    fn digest_salted() {
        let enc = DigestPasswords::with_salt(*b"NaCl");
        let out = enc.encode(Scheme::Ssha, b"secret").unwrap();
        let b64 = out.strip_prefix(b"{SSHA}").expect("prefix");
        let binary = decode_base64(b64, 0).unwrap();
        /* Digest plus the four salt bytes, salt recoverable. */
        assert_eq!(binary.len(), 24);
        assert_eq!(&binary[20..], b"NaCl");

        let out = enc.encode(Scheme::Smd5, b"secret").unwrap();
        let b64 = out.strip_prefix(b"{SMD5}").expect("prefix");
        assert_eq!(decode_base64(b64, 0).unwrap().len(), 20);
    }

    #[test]
    fn digest_refusals() {
        let enc = DigestPasswords::new();
        assert_eq!(
            enc.encode(Scheme::Ssha, b"x"),
            Err(PasswordError::MissingSalt(Scheme::Ssha))
        );
        assert_eq!(
            enc.encode(Scheme::Crypt, b"x"),
            Err(PasswordError::Unsupported(Scheme::Crypt))
        );
        assert_eq!(
            DigestPasswords::with_salt(*b"salt")
                .encode(Scheme::CryptMd5, b"x"),
            Err(PasswordError::Unsupported(Scheme::CryptMd5))
        );
    }
}
