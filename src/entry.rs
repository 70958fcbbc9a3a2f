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
 * The in-memory model for directory entries and modifications.
 *
 * An [`Entry`] is a [`Dn`] plus an ordered table of [`Attribute`]s, one
 * per attribute description.  Descriptions (the attribute name plus any
 * `;`-separated options) compare case-insensitively; values are byte
 * buffers that need not be UTF-8.  Within an attribute the value order
 * is preserved but carries no meaning: two attributes are equal when
 * their value multisets are equal byte for byte.
 *
 * Changes to an entry are expressed as a list of [`Mod`]s, each an
 * operation from [`ModOp`] on one attribute.
 *
 * ```
 * use ldapedit::{Entry, ModOp};
 *
 * let mut entry = Entry::new("cn=a,dc=example,dc=com");
 * entry.push_value("objectClass", "person");
 * entry.push_value("cn", "a");
 * entry.push_value("CN", "alias");
 *
 * /* Repeated descriptions merge, case-insensitively. */
 * assert_eq!(entry.len(), 2);
 * assert_eq!(entry.attribute("cn").unwrap().values().len(), 2);
 *
 * let mods = entry.to_mods();
 * assert_eq!(mods.len(), 2);
 * assert_eq!(mods[0].op, ModOp::Add);
 * ```
 */

use crate::dn::Dn;
use indexmap::IndexMap;
use std::fmt;

/** A modification operation, as in an LDAP modify request. */
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ModOp {
    /** Add the listed values to the attribute. */
    Add,
    /** Delete the listed values, or the whole attribute if none listed. */
    Delete,
    /** Replace all values of the attribute with the listed ones. */
    Replace,
}

impl ModOp {
    /** The keyword used for this operation in both text dialects. */
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            ModOp::Add => "add",
            ModOp::Delete => "delete",
            ModOp::Replace => "replace",
        }
    }

    /** Parse an operation keyword. */
    #[must_use]
    pub fn from_token(s: &str) -> Option<ModOp> {
        match s {
            "add" => Some(ModOp::Add),
            "delete" => Some(ModOp::Delete),
            "replace" => Some(ModOp::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for ModOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/** One modification: an operation, an attribute description, and values. */
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mod {
    /** The operation to perform. */
    pub op: ModOp,
    /** The attribute description operated on. */
    pub attribute: String,
    /** The value list, possibly empty for [`ModOp::Delete`]. */
    pub values: Vec<Vec<u8>>,
}

/**
 * An attribute description paired with its values, in document order.
 * Duplicate values are permitted.
 */
#[derive(Clone, Debug)]
pub struct Attribute {
    description: String,
    values: Vec<Vec<u8>>,
}

impl Attribute {
    /** Create an attribute with no values. */
    pub fn new(description: impl Into<String>) -> Self {
        Attribute { description: description.into(), values: Vec::new() }
    }

    /** The attribute description with its original case. */
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /** The values in document order. */
    #[must_use]
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /** Number of values. */
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /** Whether the attribute has no values. */
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /** Whether this attribute answers to `description`. */
    #[must_use]
    pub fn matches(&self, description: &str) -> bool {
        self.description.eq_ignore_ascii_case(description)
    }

    /** Append a value. */
    pub fn add_value(&mut self, value: impl Into<Vec<u8>>) {
        self.values.push(value.into());
    }

    /**
     * Remove the first value equal to `value`, byte for byte.  Returns
     * whether anything was removed.
     */
    pub fn remove_value(&mut self, value: &[u8]) -> bool {
        match self.values.iter().position(|v| v == value) {
            Some(i) => {
                self.values.remove(i);
                true
            }
            None => false,
        }
    }

    /** Whether any value equals `value`, byte for byte. */
    #[must_use]
    pub fn contains(&self, value: &[u8]) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /** A [`Mod`] of `op` carrying this attribute's values. */
    #[must_use]
    pub fn to_mod(&self, op: ModOp) -> Mod {
        Mod {
            op,
            attribute: self.description.clone(),
            values: self.values.clone(),
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.description)
            && same_values(&self.values, &other.values)
    }
}

impl Eq for Attribute {}

/*
 * Multiset equality over byte buffers.  Quadratic, but value lists are
 * short in practice.
 */
pub(crate) fn same_values(a: &[Vec<u8>], b: &[Vec<u8>]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    for v in a {
        let mut found = false;
        for (i, w) in b.iter().enumerate() {
            if !used[i] && v == w {
                used[i] = true;
                found = true;
                break;
            }
        }
        if !found {
            return false;
        }
    }
    true
}

/**
 * A directory entry: a [`Dn`] plus its attributes in document order,
 * each description occurring once.
 */
#[derive(Clone, Debug)]
pub struct Entry {
    dn: Dn,
    attributes: IndexMap<String, Attribute>,
}

impl Entry {
    /** Create an entry with no attributes. */
    pub fn new(dn: impl Into<Dn>) -> Self {
        Entry { dn: dn.into(), attributes: IndexMap::new() }
    }

    /** The entry's distinguished name. */
    #[must_use]
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /** Replace the entry's distinguished name. */
    pub fn set_dn(&mut self, dn: impl Into<Dn>) {
        self.dn = dn.into();
    }

    /** Number of attributes. */
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /** Whether the entry has no attributes. */
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /** The attributes in document order. */
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /** Look up an attribute by description, case-insensitively. */
    #[must_use]
    pub fn attribute(&self, description: &str) -> Option<&Attribute> {
        self.attributes.get(&description.to_ascii_lowercase())
    }

    /**
     * Look up an attribute by description, creating an empty one at the
     * end of the entry if it does not exist.  The first spelling of the
     * description seen is the one kept for printing.
     */
    pub fn attribute_mut(&mut self, description: &str) -> &mut Attribute {
        self.attributes
            .entry(description.to_ascii_lowercase())
            .or_insert_with(|| Attribute::new(description))
    }

    /** Append a value to the named attribute, creating it if needed. */
    pub fn push_value(&mut self, description: &str, value: impl Into<Vec<u8>>) {
        self.attribute_mut(description).add_value(value);
    }

    /**
     * The entry as a modification list: one [`ModOp::Add`] per attribute
     * in document order, each carrying all of the attribute's values.
     */
    #[must_use]
    pub fn to_mods(&self) -> Vec<Mod> {
        self.attributes.values().map(|a| a.to_mod(ModOp::Add)).collect()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.dn == other.dn && self.attributes == other.attributes
    }
}

impl Eq for Entry {}
