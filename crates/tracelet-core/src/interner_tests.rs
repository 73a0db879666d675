use crate::Interner;

#[test]
fn intern_deduplicates() {
    let mut interner = Interner::new();

    let a = interner.intern("$a");
    let b = interner.intern("$a");
    let c = interner.intern("@m");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
}

#[test]
fn resolve_returns_original_name() {
    let mut interner = Interner::new();

    let sym = interner.intern("@counts");
    assert_eq!(interner.resolve(sym), "@counts");
    assert_eq!(interner.try_resolve(sym), Some("@counts"));
}

#[test]
fn lookup_does_not_intern() {
    let mut interner = Interner::new();
    interner.intern("$x");

    assert!(interner.lookup("$x").is_some());
    assert!(interner.lookup("$y").is_none());
    assert_eq!(interner.len(), 1);
}

#[test]
fn symbol_ordering_is_insertion_order() {
    let mut interner = Interner::new();

    let z = interner.intern("z");
    let a = interner.intern("a");

    assert!(z < a);
}

#[test]
fn iter_yields_in_insertion_order() {
    let mut interner = Interner::new();
    interner.intern("$b");
    interner.intern("$a");

    let names: Vec<_> = interner.iter().map(|(_, s)| s).collect();
    assert_eq!(names, ["$b", "$a"]);
}
