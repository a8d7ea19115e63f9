#![forbid(unsafe_code)]

//! Observable value model and equality strategies.
//!
//! [`Value`] is the type watch functions produce and watchers snapshot. It is
//! a small dynamic value tree: scalars plus `Rc`-shared composites. Cloning a
//! `Value` is shallow — a cloned `List` or `Map` refers to the same underlying
//! storage — which is what gives composites *reference identity* under
//! [`Equality::Identity`]. [`Value::deep_clone`] rebuilds the whole tree and
//! is used for [`Equality::Deep`] snapshots so later comparisons run against
//! a frozen copy instead of the live, possibly mutated structure.
//!
//! # Invariants
//!
//! 1. `Num` comparison treats NaN as equal to NaN in both strategies, so a
//!    perpetually-NaN watch settles instead of firing forever.
//! 2. `Str` compares by content in both strategies; only `List` and `Map`
//!    distinguish identity (same `Rc`) from structure (same shape).
//! 3. `deep_clone` shares nothing with the source: mutating the source
//!    afterwards never changes the clone.
//!
//! # Failure Modes
//!
//! - Self-referential composites (a list pushed into itself) are unsupported:
//!   deep comparison and deep cloning recurse without a cycle table and will
//!   overflow the stack.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// How a watcher decides whether its observed value is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Equality {
    /// Reference identity for composites, content for scalars and strings,
    /// with NaN equal to NaN. In-place mutation of a shared composite is
    /// invisible to this strategy.
    #[default]
    Identity,
    /// Structural equality recursing into composites. The stored snapshot is
    /// a deep copy, so in-place mutation of the observed structure is
    /// detected on the next pass.
    Deep,
}

/// A dynamically-typed observable value.
///
/// Watch functions return a `Value`; the registry compares it against the
/// previous snapshot with the watcher's [`Equality`] strategy.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent / no meaningful value.
    Null,
    Bool(bool),
    /// All numbers are `f64`, so NaN is representable and handled.
    Num(f64),
    Str(Rc<str>),
    /// Ordered sequence with shared, internally-mutable storage.
    List(Rc<RefCell<Vec<Value>>>),
    /// String-keyed mapping with shared, internally-mutable storage.
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
}

impl Value {
    /// Build a [`Value::List`] from anything iterable.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Build a [`Value::Map`] from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Compare under the given strategy.
    #[must_use]
    pub fn matches(&self, other: &Value, equality: Equality) -> bool {
        match equality {
            Equality::Identity => self.identity_eq(other),
            Equality::Deep => self.deep_eq(other),
        }
    }

    /// Identity comparison: scalars and strings by content (NaN equal to
    /// NaN), composites by shared storage.
    #[must_use]
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural comparison recursing into composites, NaN equal to NaN.
    #[must_use]
    pub fn deep_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.deep_eq(vb))
            }
            _ => self.identity_eq(other),
        }
    }

    /// Rebuild the value tree with fresh storage for every composite.
    #[must_use]
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(items) => {
                Value::list(items.borrow().iter().map(Value::deep_clone))
            }
            Value::Map(entries) => Value::Map(Rc::new(RefCell::new(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect(),
            ))),
            scalar => scalar.clone(),
        }
    }

    #[must_use]
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Structural equality (the [`Equality::Deep`] strategy), including
/// NaN == NaN. Convenient for assertions; watchers compare through
/// [`Value::matches`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Num(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Num(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
