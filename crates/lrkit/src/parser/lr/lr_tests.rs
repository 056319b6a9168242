use super::*;

const A: Terminal = Terminal(0);
const B: Terminal = Terminal(1);
const END: Terminal = Terminal::TERMINATE;

fn s(i: usize) -> StateIdx {
    StateIdx::new(i)
}

fn t(terminal: Terminal) -> Symbol {
    Symbol::Terminal(terminal)
}

fn nt(nt: NT) -> Symbol {
    Symbol::Nonterminal(nt)
}

fn item(production: &Production, dot: usize, lookahead: Terminal) -> LR1Item {
    LR1Item::new(production.clone(), dot, lookahead)
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// S' -> S, S -> a S, S -> b
fn right_recursive_grammar() -> (Grammar, Vec<Production>) {
    let productions = vec![
        Production::new(0, vec![nt(1)]),
        Production::new(1, vec![t(A), nt(1)]),
        Production::new(1, vec![t(B)]),
    ];
    let grammar = Grammar::new(names(&["S'", "S"]), names(&["a", "b"]), productions.clone(), 0)
        .expect("valid grammar");
    (grammar, productions)
}

fn right_recursive_automaton(p: &[Production]) -> Automaton {
    Automaton::new(vec![
        State::new(s(0))
            .with_item(item(&p[0], 0, END))
            .with_item(item(&p[1], 0, END))
            .with_item(item(&p[2], 0, END))
            .with_transition(nt(1), s(1))
            .with_transition(t(A), s(2))
            .with_transition(t(B), s(3)),
        State::new(s(1)).with_item(item(&p[0], 1, END)),
        State::new(s(2))
            .with_item(item(&p[1], 1, END))
            .with_item(item(&p[1], 0, END))
            .with_item(item(&p[2], 0, END))
            .with_transition(nt(1), s(4))
            .with_transition(t(A), s(2))
            .with_transition(t(B), s(3)),
        State::new(s(3)).with_item(item(&p[2], 1, END)),
        State::new(s(4)).with_item(item(&p[1], 2, END)),
    ])
    .expect("valid automaton")
}

#[test_log::test]
fn test_conflict_free_tables_mirror_transitions() {
    let (grammar, p) = right_recursive_grammar();
    let automaton = right_recursive_automaton(&p);
    let tables = build_tables(&automaton, &grammar).expect("tables");

    assert!(tables.is_deterministic());

    let mut terminal_edges = 0;
    let mut nonterminal_edges = 0;
    for state in automaton.states() {
        for (symbol, target) in &state.transitions {
            match *symbol {
                Symbol::Terminal(terminal) => {
                    terminal_edges += 1;
                    assert_eq!(
                        tables.action_at(state.index, terminal),
                        Some(LRAction::Shift(*target))
                    );
                }
                Symbol::Nonterminal(n) => {
                    nonterminal_edges += 1;
                    assert_eq!(tables.goto_at(state.index, n), Some(*target));
                }
                Symbol::Epsilon => unreachable!(),
            }
        }
    }

    let shifts = tables
        .action
        .iter()
        .filter(|(_, _, action)| matches!(action, LRAction::Shift(_)))
        .count();
    assert_eq!(shifts, terminal_edges);
    assert_eq!(tables.goto.len(), nonterminal_edges);

    assert_eq!(tables.action_at(s(1), END), Some(LRAction::Accept));
    assert_eq!(tables.action_at(s(3), END), Some(LRAction::Reduce(2)));
    assert_eq!(tables.action_at(s(4), END), Some(LRAction::Reduce(1)));
    // a miss means a syntax error
    assert_eq!(tables.action_at(s(1), A), None);
    assert_eq!(tables.action.len(), 7);
}

#[test]
fn test_shift_then_reduce_keeps_shift() {
    let mut table = ActionTable::new();
    table
        .register(s(0), LRAction::Shift(s(3)), A)
        .expect("empty slot");

    let conflict = table
        .register(s(0), LRAction::Reduce(2), A)
        .expect_err("slot is taken");
    assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
    assert_eq!(conflict.kept, LRAction::Shift(s(3)));
    assert_eq!(conflict.rejected, LRAction::Reduce(2));
    assert_eq!(table.get(s(0), A), Some(LRAction::Shift(s(3))));
}

#[test]
fn test_reduce_then_shift_keeps_reduce() {
    let mut table = ActionTable::new();
    table
        .register(s(5), LRAction::Reduce(1), B)
        .expect("empty slot");

    let conflict = table
        .register(s(5), LRAction::Shift(s(2)), B)
        .expect_err("slot is taken");
    assert_eq!(conflict.kind(), ConflictKind::ShiftReduce);
    assert_eq!(table.get(s(5), B), Some(LRAction::Reduce(1)));
    assert_eq!(
        conflict.to_string(),
        "conflict in action table: state 5, terminal t1: [reduce 1] vs [shift 2]"
    );
}

#[test]
fn test_reduce_reduce_and_repeated_actions() {
    let mut table = ActionTable::new();
    table.register(s(1), LRAction::Reduce(1), END).expect("empty slot");
    // the same action twice is not a conflict
    table.register(s(1), LRAction::Reduce(1), END).expect("same action");

    let conflict = table
        .register(s(1), LRAction::Reduce(4), END)
        .expect_err("slot is taken");
    assert_eq!(conflict.kind(), ConflictKind::ReduceReduce);
    assert_eq!(table.len(), 1);
}

#[test_log::test]
fn test_build_reports_shift_reduce_in_item_order() {
    // S' -> S, S -> a, S -> a a ; LR(0)-style state mixing a completed and a shift item on `a`
    let p = vec![
        Production::new(0, vec![nt(1)]),
        Production::new(1, vec![t(A)]),
        Production::new(1, vec![t(A), t(A)]),
    ];
    let grammar =
        Grammar::new(names(&["S'", "S"]), names(&["a"]), p.clone(), 0).expect("valid grammar");

    let reduce_first = Automaton::new(vec![
        State::new(s(0))
            .with_item(item(&p[1], 1, A))
            .with_item(item(&p[2], 1, A))
            .with_transition(t(A), s(1)),
        State::new(s(1)).with_item(item(&p[2], 2, END)),
    ])
    .expect("valid automaton");
    let tables = build_tables(&reduce_first, &grammar).expect("tables");
    assert_eq!(tables.conflicts().len(), 1);
    assert_eq!(tables.action_at(s(0), A), Some(LRAction::Reduce(1)));

    let shift_first = Automaton::new(vec![
        State::new(s(0))
            .with_item(item(&p[2], 1, A))
            .with_item(item(&p[1], 1, A))
            .with_transition(t(A), s(1)),
        State::new(s(1)).with_item(item(&p[2], 2, END)),
    ])
    .expect("valid automaton");
    let tables = build_tables(&shift_first, &grammar).expect("tables");
    assert_eq!(tables.conflicts().len(), 1);
    assert_eq!(tables.conflicts()[0].kind(), ConflictKind::ShiftReduce);
    assert_eq!(tables.action_at(s(0), A), Some(LRAction::Shift(s(1))));
    assert!(!tables.is_deterministic());
}

#[test]
fn test_augmented_item_on_end_accepts() {
    let (grammar, p) = right_recursive_grammar();
    let automaton = Automaton::new(vec![State::new(s(0)).with_item(item(&p[0], 1, END))])
        .expect("valid automaton");
    let tables = build_tables(&automaton, &grammar).expect("tables");

    assert_eq!(tables.action_at(s(0), END), Some(LRAction::Accept));
    assert!(tables
        .action
        .iter()
        .all(|(_, _, action)| action != LRAction::Reduce(0)));
}

#[test]
fn test_augmented_item_on_other_lookahead_reduces() {
    let (grammar, p) = right_recursive_grammar();
    let automaton = Automaton::new(vec![State::new(s(0)).with_item(item(&p[0], 1, A))])
        .expect("valid automaton");
    let tables = build_tables(&automaton, &grammar).expect("tables");

    assert_eq!(tables.action_at(s(0), A), Some(LRAction::Reduce(0)));
    assert_eq!(tables.action_at(s(0), END), None);
}

#[test]
fn test_epsilon_items_add_no_shift_or_goto() {
    // S' -> S, S -> ε
    let p = vec![Production::new(0, vec![nt(1)]), Production::empty(1)];
    let grammar =
        Grammar::new(names(&["S'", "S"]), names(&[]), p.clone(), 0).expect("valid grammar");
    let automaton = Automaton::new(vec![State::new(s(0)).with_item(item(&p[1], 0, A))])
        .expect("valid automaton");

    let tables = build_tables(&automaton, &grammar).expect("tables");
    assert!(tables.goto.is_empty());
    assert_eq!(tables.action.len(), 1);
    assert_eq!(tables.action_at(s(0), A), Some(LRAction::Reduce(1)));
}

#[test]
fn test_missing_production_and_transition_are_errors() {
    let (grammar, p) = right_recursive_grammar();

    let stray = Production::new(1, vec![t(B), t(B)]);
    let automaton = Automaton::new(vec![State::new(s(0)).with_item(item(&stray, 2, END))])
        .expect("valid automaton");
    assert_eq!(
        build_tables(&automaton, &grammar).unwrap_err(),
        TableError::UnknownProduction {
            state: s(0),
            production: stray
        }
    );

    let automaton = Automaton::new(vec![State::new(s(0)).with_item(item(&p[1], 0, END))])
        .expect("valid automaton");
    assert_eq!(
        build_tables(&automaton, &grammar).unwrap_err(),
        TableError::MissingTransition {
            state: s(0),
            symbol: t(A)
        }
    );
}

#[test]
fn test_snapshots_are_independent() {
    let (grammar, p) = right_recursive_grammar();
    let tables = build_tables(&right_recursive_automaton(&p), &grammar).expect("tables");

    let mut action = tables.action.snapshot();
    action
        .register(s(9), LRAction::Reduce(1), A)
        .expect("empty slot");
    assert_eq!(tables.action.get(s(9), A), None);
    assert_eq!(action.len(), tables.action.len() + 1);

    let mut goto = tables.goto.snapshot();
    goto.register(s(0), s(3), 1);
    assert_eq!(tables.goto.get(s(0), 1), Some(s(1)));
    assert_eq!(goto.get(s(0), 1), Some(s(3)));
}

#[test]
fn test_conflicts_recorded_once_per_rejected_action() {
    let p = vec![
        Production::new(0, vec![Symbol::Nonterminal(1)]),
        Production::new(1, vec![t(A)]),
        Production::new(1, vec![t(A), t(A)]),
    ];
    let grammar =
        Grammar::new(names(&["S'", "S"]), names(&["a", "b"]), p.clone(), 0).expect("valid grammar");

    let automaton = Automaton::new(vec![
        State::new(s(0))
            .with_item(item(&p[1], 1, A))
            .with_item(item(&p[2], 1, A))
            .with_item(item(&p[2], 1, B))
            .with_item(item(&p[2], 1, END))
            .with_item(item(&p[2], 2, A))
            .with_item(item(&p[2], 2, A))
            .with_transition(t(A), s(1)),
        State::new(s(1)).with_item(item(&p[2], 2, END)),
    ])
    .expect("valid automaton");
    let tables = build_tables(&automaton, &grammar).expect("tables");

    let expected = vec![
        TableConflict {
            state: s(0),
            terminal: A,
            kept: LRAction::Reduce(1),
            rejected: LRAction::Shift(s(1)),
        },
        TableConflict {
            state: s(0),
            terminal: A,
            kept: LRAction::Reduce(1),
            rejected: LRAction::Reduce(2),
        },
    ];
    assert_eq!(tables.conflicts(), expected.as_slice());
    assert_eq!(tables.action_at(s(0), A), Some(LRAction::Reduce(1)));
}
