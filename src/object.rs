// File: src/object.rs
//
// Runtime value universe shared by the compiler (for constants) and the VM
// (for everything on the stack). A closed enum rather than a trait object:
// there's a fixed, small set of shapes and no user-definable types.

use crate::code::Instructions;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    Str(Rc<String>),
    Array(Rc<RefCell<Vec<Object>>>),
    Hash(Rc<HashMap<HashKey, (Object, Object)>>),
    CompiledFunction(Rc<CompiledFunction>),
    Error(Rc<String>),
    Builtin(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// The canonical projection of a hashable object, decoupled from the object
/// itself so a `Hash` can still hand back the original key object for
/// inspection while using a cheap `(tag, digest)` pair as the map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: HashKeyKind,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKeyKind {
    Integer,
    Boolean,
    Str,
}

/// FNV-1a, 64-bit variant — matches the original implementation's use of
/// Go's `hash/fnv` package for string hash keys.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::Null => "NULL",
            Object::Str(_) => "STRING",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::CompiledFunction(_) => "COMPILED_FUNCTION_OBJ",
            Object::Error(_) => "ERROR",
            Object::Builtin(_) => "BUILTIN",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    /// Returns the hashable projection of this object, or `None` if the
    /// variant cannot be used as a Hash key.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Integer(v) => Some(HashKey { kind: HashKeyKind::Integer, value: *v as u64 }),
            Object::Boolean(b) => Some(HashKey { kind: HashKeyKind::Boolean, value: if *b { 1 } else { 0 } }),
            Object::Str(s) => Some(HashKey { kind: HashKeyKind::Str, value: fnv1a(s.as_bytes()) }),
            _ => None,
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Object::Integer(v) => v.to_string(),
            Object::Boolean(b) => b.to_string(),
            Object::Null => "null".to_string(),
            Object::Str(s) => (**s).clone(),
            Object::Array(items) => {
                let rendered: Vec<String> = items.borrow().iter().map(|o| o.inspect()).collect();
                format!("[{}]", rendered.join(", "))
            }
            Object::Hash(pairs) => {
                let rendered: Vec<String> =
                    pairs.values().map(|(k, v)| format!("{}: {}", k.inspect(), v.inspect())).collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Object::CompiledFunction(f) => format!("CompiledFunction[{:p}]", Rc::as_ptr(f)),
            Object::Error(msg) => format!("ERROR: {}", msg),
            Object::Builtin(idx) => format!("builtin function #{}", idx),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inspect())
    }
}

/// Comparison used by `Equal`/`NotEqual` on non-integer operands: identity
/// equality on singletons, content equality on strings. Integers are
/// compared by value before this helper is ever consulted (see the VM's
/// comparison opcode handling).
pub fn object_equals(a: &Object, b: &Object) -> bool {
    match (a, b) {
        (Object::Integer(x), Object::Integer(y)) => x == y,
        (Object::Boolean(x), Object::Boolean(y)) => x == y,
        (Object::Null, Object::Null) => true,
        (Object::Str(x), Object::Str(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_hash_keys_match_for_equal_content() {
        let a = Object::Str(Rc::new("hello".to_string()));
        let b = Object::Str(Rc::new("hello".to_string()));
        assert_eq!(a.hash_key(), b.hash_key());
    }

    #[test]
    fn string_hash_keys_differ_for_different_content() {
        let a = Object::Str(Rc::new("hello".to_string()));
        let b = Object::Str(Rc::new("world".to_string()));
        assert_ne!(a.hash_key(), b.hash_key());
    }

    #[test]
    fn arrays_and_hashes_are_not_hashable() {
        assert!(Object::Array(Rc::new(RefCell::new(vec![]))).hash_key().is_none());
    }

    #[test]
    fn truthiness() {
        assert!(!Object::Boolean(false).is_truthy());
        assert!(!Object::Null.is_truthy());
        assert!(Object::Boolean(true).is_truthy());
        assert!(Object::Integer(0).is_truthy());
    }
}
