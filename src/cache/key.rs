//! Cache Key Module
//!
//! Canonical rendering of a call `(namespace, operation, args)` and its digest.
//!
//! The canonical form walks the whole argument graph with no depth or length
//! limit, so distinct queries never share a rendering. Symbols, functions and
//! opaque handles render by their tag, never by identity: two independently
//! built but equivalent predicates produce the same key.
//!
//! Keys are the 128-bit xxh3 digest of the canonical form. A digest collision
//! would serve one query's cached result for another; at 2^128 the risk is
//! accepted rather than keeping the full rendering around for comparison.

use std::fmt::{self, Display, Write};

use xxhash_rust::xxh3::xxh3_128;

use crate::model::Arg;

// == Cache Key ==
/// Canonical form of a call together with its digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub canonical: String,
    pub hash: String,
}

impl CacheKey {
    pub fn new(namespace: &str, operation: &str, args: &[Arg]) -> Self {
        let canonical = canonicalize(namespace, operation, args);
        let hash = digest(&canonical);
        Self { canonical, hash }
    }
}

// == Canonicalize ==
/// Renders a call descriptor deterministically.
pub fn canonicalize(namespace: &str, operation: &str, args: &[Arg]) -> String {
    format!(
        "{{name: {:?}, prop: {:?}, args: {}}}",
        namespace,
        operation,
        Canonical(&ArgList(args))
    )
}

// == Digest ==
/// Reduces a canonical form to a fixed-length 32 character hex string.
pub fn digest(canonical: &str) -> String {
    format!("{:032x}", xxh3_128(canonical.as_bytes()))
}

struct ArgList<'a>(&'a [Arg]);

struct Canonical<'a, T: ?Sized>(&'a T);

impl Display for Canonical<'_, ArgList<'_>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_seq(f, self.0 .0)
    }
}

impl Display for Canonical<'_, Arg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_arg(f, self.0)
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Arg]) -> fmt::Result {
    f.write_char('[')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_arg(f, item)?;
    }
    f.write_char(']')
}

fn write_arg(f: &mut fmt::Formatter<'_>, arg: &Arg) -> fmt::Result {
    match arg {
        Arg::Null => f.write_str("null"),
        Arg::Bool(b) => write!(f, "{b}"),
        Arg::Int(i) => write!(f, "{i}"),
        // Debug keeps a decimal point or exponent, so 1 and 1.0 stay distinct
        Arg::Float(x) => write!(f, "{x:?}"),
        Arg::Str(s) => write!(f, "{s:?}"),
        Arg::List(items) => write_seq(f, items),
        Arg::Map(entries) => {
            f.write_char('{')?;
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_arg(f, key)?;
                f.write_str(": ")?;
                write_arg(f, value)?;
            }
            f.write_char('}')
        }
        Arg::Symbol(tag) => write!(f, "Symbol({tag:?})"),
        Arg::Function { name, args } => {
            write!(f, "Fn({name:?}, ")?;
            write_seq(f, args)?;
            f.write_char(')')
        }
        Arg::Opaque(opaque) => write!(f, "Opaque({:?})", opaque.tag()),
    }
}
