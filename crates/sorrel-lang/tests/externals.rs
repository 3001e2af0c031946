//! Dynamically scoped variables: let-cells, external access, sibling
//! visibility, shadowing and the unbound-read error.

use std::sync::Arc;

use sorrel_lang::sexp::{form, list, nil, q, sym};
use sorrel_lang::{Grammar, NativeFn, Pattern, Processor, RuleDef, SorrelError, Value};

fn recorder(name: &'static str) -> Processor {
    // Stores the matched value into the external cell `name` and passes
    // the match through unchanged.
    Processor::Destructure {
        pattern: Pattern::var("v"),
        func: Arc::new(NativeFn::with_name("record", move |vars, args| {
            vars.set(name, args[0].clone())?;
            Ok(args[0].clone())
        })),
    }
}

fn reader(name: &'static str) -> Processor {
    // Replaces the matched value with the external cell's current value.
    Processor::Destructure {
        pattern: Pattern::Ignore,
        func: Arc::new(NativeFn::with_name("read-back", move |vars, _| {
            vars.get(name)
        })),
    }
}

#[test]
fn writes_are_visible_to_later_siblings() {
    let mut g = Grammar::new();
    g.define(
        RuleDef::new("pair", form("and", [sym("store"), sym("recall")]))
            .let_var("seen", nil()),
    )
    .unwrap();
    g.define(
        RuleDef::new("store", sym("symbol"))
            .external("seen")
            .processor(recorder("seen")),
    )
    .unwrap();
    g.define(
        RuleDef::new("recall", sym("symbol"))
            .external("seen")
            .processor(reader("seen")),
    )
    .unwrap();

    let got = g.parse("pair", list([sym("x"), sym("y")])).unwrap();
    // The second element is what `store` recorded, not what `recall`
    // matched.
    assert_eq!(got, Some(list([sym("x"), sym("x")])));
}

#[test]
fn cells_are_discarded_when_the_introducing_rule_returns() {
    let mut g = Grammar::new();
    g.define(
        RuleDef::new("scoped", sym("store")).let_var("seen", nil()),
    )
    .unwrap();
    g.define(
        RuleDef::new("store", sym("symbol"))
            .external("seen")
            .processor(recorder("seen")),
    )
    .unwrap();

    assert!(g.parse("scoped", list([sym("x")])).unwrap().is_some());
    // Without the ancestor's let, the same rule is out of context.
    let err = g.parse("store", list([sym("x")])).unwrap_err();
    assert!(matches!(err, SorrelError::UnboundExternal(_)));
}

#[test]
fn inner_lets_shadow_and_restore() {
    let mut g = Grammar::new();
    g.define(
        RuleDef::new(
            "outer",
            form("and", [sym("inner"), sym("recall")]),
        )
        .let_var("seen", Value::symbol("outer-value")),
    )
    .unwrap();
    // `inner` introduces its own `seen`; the write lands in the inner
    // cell and the outer one keeps its value.
    g.define(
        RuleDef::new("inner", sym("store")).let_var("seen", nil()),
    )
    .unwrap();
    g.define(
        RuleDef::new("store", sym("symbol"))
            .external("seen")
            .processor(recorder("seen")),
    )
    .unwrap();
    g.define(
        RuleDef::new("recall", sym("symbol"))
            .external("seen")
            .processor(reader("seen")),
    )
    .unwrap();

    let got = g.parse("outer", list([sym("x"), sym("y")])).unwrap();
    assert_eq!(got, Some(list([sym("x"), sym("outer-value")])));
}

#[test]
fn initial_values_are_set_at_introduction() {
    let mut g = Grammar::new();
    g.define(
        RuleDef::new("with-init", sym("recall")).let_var("seen", Value::symbol("init")),
    )
    .unwrap();
    g.define(
        RuleDef::new("recall", sym("symbol"))
            .external("seen")
            .processor(reader("seen")),
    )
    .unwrap();

    let got = g.parse("with-init", list([sym("x")])).unwrap();
    assert_eq!(got, Some(sym("init")));
}

#[test]
fn repetition_counts_resolve_through_the_dynamic_chain() {
    let mut g = Grammar::new();
    g.define(
        RuleDef::new("sized", form("and", [sym("store-len"), sym("body")]))
            .let_var("n", nil()),
    )
    .unwrap();
    g.define(
        RuleDef::new("store-len", sym("number"))
            .external("n")
            .processor(recorder("n")),
    )
    .unwrap();
    g.define(
        RuleDef::new("body", form("rep", [sym("n"), q(sym("a"))])).external("n"),
    )
    .unwrap();

    let two = list([Value::Int(2), sym("a"), sym("a")]);
    assert!(g.parse("sized", two).unwrap().is_some());
    let short = list([Value::Int(2), sym("a")]);
    assert_eq!(g.parse("sized", short).unwrap(), None);

    // A count that is not a non-negative integer is a usage error.
    let bad = list([Value::Float(2.5), sym("a"), sym("a")]);
    let err = g.parse("sized", bad).unwrap_err();
    assert!(matches!(err, SorrelError::TypeMismatch { .. }));
}
