// File: src/builtins.rs
//
// Native functions registered into the outermost symbol table at fixed
// indices, so the compiler can emit `OpGetBuiltin i` instead of a name
// lookup. Order matters: it is the contract between this table and
// `symbol_table::SymbolTable::define_builtin`.

use crate::object::Object;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

pub const NAMES: [&str; 6] = ["len", "puts", "first", "last", "rest", "push"];

pub fn get(index: usize) -> fn(&[Object], &mut dyn Write) -> Object {
    FUNCTIONS[index]
}

pub fn lookup_index(name: &str) -> Option<usize> {
    NAMES.iter().position(|&n| n == name)
}

const FUNCTIONS: [fn(&[Object], &mut dyn Write) -> Object; 6] =
    [len, puts, first, last, rest, push];

fn error(msg: String) -> Object {
    Object::Error(Rc::new(msg))
}

fn wrong_arity(want: usize, got: usize) -> Object {
    error(format!("wrong number of arguments. got={}, want={}", got, want))
}

fn len(args: &[Object], _out: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return wrong_arity(1, args.len());
    }
    match &args[0] {
        Object::Str(s) => Object::Integer(s.as_bytes().len() as i64),
        Object::Array(items) => Object::Integer(items.borrow().len() as i64),
        other => error(format!("argument to `len` not supported, got {}", other.type_name())),
    }
}

fn puts(args: &[Object], out: &mut dyn Write) -> Object {
    for arg in args {
        let _ = writeln!(out, "{}", arg.inspect());
    }
    Object::Null
}

fn first(args: &[Object], _out: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return wrong_arity(1, args.len());
    }
    match &args[0] {
        Object::Array(items) => items.borrow().first().cloned().unwrap_or(Object::Null),
        other => error(format!("argument to `first` must be ARRAY, got {}", other.type_name())),
    }
}

fn last(args: &[Object], _out: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return wrong_arity(1, args.len());
    }
    match &args[0] {
        Object::Array(items) => items.borrow().last().cloned().unwrap_or(Object::Null),
        other => error(format!("argument to `last` must be ARRAY, got {}", other.type_name())),
    }
}

fn rest(args: &[Object], _out: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return wrong_arity(1, args.len());
    }
    match &args[0] {
        Object::Array(items) => {
            let items = items.borrow();
            if items.is_empty() {
                Object::Null
            } else {
                Object::Array(Rc::new(RefCell::new(items[1..].to_vec())))
            }
        }
        other => error(format!("argument to `rest` must be ARRAY, got {}", other.type_name())),
    }
}

/// Returns the new array with `args[1]` appended. The original
/// implementation builds this array and then returns Null instead of it —
/// a confirmed bug; this port returns the array it built.
fn push(args: &[Object], _out: &mut dyn Write) -> Object {
    if args.len() != 2 {
        return wrong_arity(2, args.len());
    }
    match &args[0] {
        Object::Array(items) => {
            let mut new_items = items.borrow().clone();
            new_items.push(args[1].clone());
            Object::Array(Rc::new(RefCell::new(new_items)))
        }
        other => error(format!("argument to `push` must be ARRAY, got {}", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: &[Object]) -> Object {
        let idx = lookup_index(name).unwrap();
        let mut sink = Vec::new();
        get(idx)(args, &mut sink)
    }

    fn arr(values: Vec<Object>) -> Object {
        Object::Array(Rc::new(RefCell::new(values)))
    }

    #[test]
    fn len_on_string_and_array() {
        assert!(matches!(run("len", &[Object::Str(Rc::new("monkey".into()))]), Object::Integer(6)));
        assert!(matches!(run("len", &[arr(vec![Object::Integer(1), Object::Integer(2)])]), Object::Integer(2)));
    }

    #[test]
    fn len_wrong_type_is_error() {
        assert!(matches!(run("len", &[Object::Integer(1)]), Object::Error(_)));
    }

    #[test]
    fn first_last_rest_on_empty_array() {
        let empty = arr(vec![]);
        assert!(matches!(run("first", &[empty.clone()]), Object::Null));
        assert!(matches!(run("last", &[empty.clone()]), Object::Null));
        assert!(matches!(run("rest", &[empty]), Object::Null));
    }

    #[test]
    fn push_returns_new_array_with_value_appended() {
        let original = arr(vec![Object::Integer(1), Object::Integer(2)]);
        let result = run("push", &[original.clone(), Object::Integer(3)]);
        match result {
            Object::Array(items) => {
                let items = items.borrow();
                assert_eq!(items.len(), 3);
                assert!(matches!(items[2], Object::Integer(3)));
            }
            other => panic!("expected array, got {:?}", other),
        }
        // original array is untouched
        match original {
            Object::Array(items) => assert_eq!(items.borrow().len(), 2),
            _ => unreachable!(),
        }
    }

    #[test]
    fn wrong_arity_is_error() {
        assert!(matches!(run("len", &[]), Object::Error(_)));
        assert!(matches!(run("push", &[Object::Integer(1)]), Object::Error(_)));
    }
}
