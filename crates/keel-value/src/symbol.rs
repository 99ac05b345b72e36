//! Symbols
//!
//! Symbols compare by identity. Registered symbols are interned per thread,
//! so two lookups of the same key always yield the same symbol.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHashMap;

struct SymbolData {
    description: Option<Rc<str>>,
    registered: bool,
}

/// An identity-compared symbol
#[derive(Clone)]
pub struct Symbol(Rc<SymbolData>);

thread_local! {
    static REGISTRY: RefCell<FxHashMap<Rc<str>, Symbol>> = RefCell::new(FxHashMap::default());
    static TO_STRING_TAG: Symbol = Symbol::new("Symbol.toStringTag");
}

impl Symbol {
    /// Create a fresh, unregistered symbol
    pub fn new(description: impl Into<Rc<str>>) -> Self {
        Symbol(Rc::new(SymbolData {
            description: Some(description.into()),
            registered: false,
        }))
    }

    /// Create a fresh symbol without description
    pub fn anonymous() -> Self {
        Symbol(Rc::new(SymbolData {
            description: None,
            registered: false,
        }))
    }

    /// Look up (or create) the registered symbol for `key`
    pub fn for_key(key: &str) -> Self {
        REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            if let Some(symbol) = registry.get(key) {
                return symbol.clone();
            }
            let key: Rc<str> = Rc::from(key);
            let symbol = Symbol(Rc::new(SymbolData {
                description: Some(key.clone()),
                registered: true,
            }));
            registry.insert(key, symbol.clone());
            symbol
        })
    }

    /// The well-known `Symbol.toStringTag`
    pub fn to_string_tag() -> Self {
        TO_STRING_TAG.with(Symbol::clone)
    }

    /// Description given at creation
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Whether this symbol came from [`Symbol::for_key`]
    pub fn is_registered(&self) -> bool {
        self.0.registered
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
