//! Call arguments
//!
//! The value graph passed to model operations. Besides plain data it can hold
//! symbolic operator markers, named SQL function calls and opaque handles.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Key inside a query options map that carries a transaction.
pub const TRANSACTION_KEY: &str = "transaction";

// == Arg ==
/// One argument of a model operation.
#[derive(Debug, Clone)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Arg>),
    /// Insertion-ordered mapping; keys may be symbols as well as names
    Map(Vec<(Arg, Arg)>),
    /// Symbolic marker such as a comparison operator (`Op.lte`)
    Symbol(String),
    /// Named function call evaluated by the backend, e.g. `NOW()`
    Function { name: String, args: Vec<Arg> },
    Opaque(Opaque),
}

impl Arg {
    pub fn str(value: impl Into<String>) -> Self {
        Arg::Str(value.into())
    }

    pub fn symbol(tag: impl Into<String>) -> Self {
        Arg::Symbol(tag.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Arg::Function {
            name: name.into(),
            args,
        }
    }

    /// Builds a map with named keys.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Arg)>,
    {
        Arg::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Arg::Str(k.into()), v))
                .collect(),
        )
    }

    /// Looks up a named key in a map argument.
    pub fn get(&self, key: &str) -> Option<&Arg> {
        match self {
            Arg::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Arg::Str(name) if name == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    /// `Null` and `false` are the only falsy values.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Arg::Null | Arg::Bool(false))
    }
}

/// True when any top-level options map carries an active transaction.
pub fn has_transaction(args: &[Arg]) -> bool {
    args.iter()
        .filter_map(|arg| arg.get(TRANSACTION_KEY))
        .any(Arg::is_truthy)
}

// == Opaque ==
/// An arbitrary handle that takes part in a call only through its tag.
#[derive(Clone)]
pub struct Opaque {
    tag: String,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new(tag: impl Into<String>, handle: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            tag: tag.into(),
            handle,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn handle(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.handle
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.tag).finish()
    }
}

// == Conversions ==
impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Arg::Null,
            Value::Bool(b) => Arg::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Arg::Int(i),
                None => Arg::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Arg::Str(s),
            Value::Array(items) => Arg::List(items.into_iter().map(Arg::from).collect()),
            Value::Object(fields) => Arg::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (Arg::Str(k), Arg::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self {
        Arg::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let arg = Arg::from(json!({ "where": { "id": 7, "score": 1.5 }, "raw": true }));
        let filter = arg.get("where").unwrap();
        assert!(matches!(filter.get("id"), Some(Arg::Int(7))));
        assert!(matches!(filter.get("score"), Some(Arg::Float(f)) if *f == 1.5));
        assert!(matches!(arg.get("raw"), Some(Arg::Bool(true))));
        assert!(arg.get("missing").is_none());
    }

    #[test]
    fn test_has_transaction() {
        let tx = Arg::from(json!({ "where": {}, "transaction": true }));
        assert!(has_transaction(&[tx]));

        let handle = Arg::map([(
            TRANSACTION_KEY,
            Arg::Opaque(Opaque::new("Transaction", Arc::new(42u32))),
        )]);
        assert!(has_transaction(&[Arg::Int(1), handle]));
    }

    #[test]
    fn test_inactive_transaction_does_not_count() {
        assert!(!has_transaction(&[Arg::from(json!({ "transaction": null }))]));
        assert!(!has_transaction(&[Arg::from(json!({ "transaction": false }))]));
        assert!(!has_transaction(&[Arg::from(json!({ "where": { "transaction": true } }))]));
        assert!(!has_transaction(&[]));
    }

    #[test]
    fn test_opaque_downcast() {
        let opaque = Opaque::new("Counter", Arc::new(5usize));
        assert_eq!(opaque.tag(), "Counter");
        assert_eq!(opaque.downcast_ref::<usize>(), Some(&5));
        assert!(opaque.downcast_ref::<String>().is_none());
    }
}
