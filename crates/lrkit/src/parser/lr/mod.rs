use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use super::automaton::{Automaton, LR1Item, State, StateIdx};
use super::grammar::{Grammar, Production, Symbol, Terminal, NT};

// a missing entry in the action table is a syntax error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LRAction {
    Shift(StateIdx),
    // operand is the production index in the grammar
    Reduce(usize),
    Accept,
}

impl fmt::Display for LRAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LRAction::Shift(state) => write!(f, "shift {}", state),
            LRAction::Reduce(production) => write!(f, "reduce {}", production),
            LRAction::Accept => write!(f, "accept"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    ShiftShift,
    // accept collided with some other action on end of input
    Accept,
}

/// Two different actions demanded for the same (state, terminal) cell. The
/// `kept` action is the one that was registered first and stays in the table.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("conflict in action table: state {state}, terminal {terminal}: [{kept}] vs [{rejected}]")]
pub struct TableConflict {
    pub state: StateIdx,
    pub terminal: Terminal,
    pub kept: LRAction,
    pub rejected: LRAction,
}

impl TableConflict {
    pub fn kind(&self) -> ConflictKind {
        use LRAction::*;
        match (self.kept, self.rejected) {
            (Accept, _) | (_, Accept) => ConflictKind::Accept,
            (Shift(_), Shift(_)) => ConflictKind::ShiftShift,
            (Reduce(_), Reduce(_)) => ConflictKind::ReduceReduce,
            (Shift(_), Reduce(_)) | (Reduce(_), Shift(_)) => ConflictKind::ShiftReduce,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("state {state} reduces by a production the grammar does not know: {production:?}")]
    UnknownProduction {
        state: StateIdx,
        production: Production,
    },
    #[error("state {state} has no transition on {symbol:?}")]
    MissingTransition { state: StateIdx, symbol: Symbol },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionTable(HashMap<StateIdx, HashMap<Terminal, LRAction>>);

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    // first registered action wins; re-registering the same action is a no-op
    pub fn register(
        &mut self,
        state: StateIdx,
        action: LRAction,
        terminal: Terminal,
    ) -> Result<(), TableConflict> {
        let row = self.0.entry(state).or_default();
        match row.get(&terminal) {
            Some(existing) if *existing == action => Ok(()),
            Some(existing) => Err(TableConflict {
                state,
                terminal,
                kept: *existing,
                rejected: action,
            }),
            None => {
                row.insert(terminal, action);
                Ok(())
            }
        }
    }

    pub fn get(&self, state: StateIdx, terminal: Terminal) -> Option<LRAction> {
        self.0.get(&state)?.get(&terminal).copied()
    }

    pub fn row(&self, state: StateIdx) -> Option<&HashMap<Terminal, LRAction>> {
        self.0.get(&state)
    }

    // number of filled cells
    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateIdx, Terminal, LRAction)> + '_ {
        self.0.iter().flat_map(|(state, row)| {
            row.iter()
                .map(move |(terminal, action)| (*state, *terminal, *action))
        })
    }

    // independent copy, changes to it never reach this table
    pub fn snapshot(&self) -> ActionTable {
        self.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GotoTable(HashMap<StateIdx, HashMap<NT, StateIdx>>);

impl GotoTable {
    pub fn new() -> Self {
        Self::default()
    }

    // a correct automaton never produces two targets for one cell, last write wins
    pub fn register(&mut self, state: StateIdx, next_state: StateIdx, nt: NT) {
        let row = self.0.entry(state).or_default();
        if let Some(previous) = row.insert(nt, next_state) {
            if previous != next_state {
                debug!(
                    "goto table: state {}, nonterminal {} overwritten {} -> {}",
                    state, nt, previous, next_state
                );
            }
        }
    }

    pub fn get(&self, state: StateIdx, nt: NT) -> Option<StateIdx> {
        self.0.get(&state)?.get(&nt).copied()
    }

    pub fn row(&self, state: StateIdx) -> Option<&HashMap<NT, StateIdx>> {
        self.0.get(&state)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateIdx, NT, StateIdx)> + '_ {
        self.0.iter().flat_map(|(state, row)| {
            row.iter().map(move |(nt, next)| (*state, *nt, *next))
        })
    }

    pub fn snapshot(&self) -> GotoTable {
        self.clone()
    }
}

#[derive(Clone, Debug, Default)]
pub struct LRTables {
    pub action: ActionTable,
    pub goto: GotoTable,
    conflicts: Vec<TableConflict>,
    // (state, terminal, rejected) of every conflict already recorded
    seen_conflicts: HashSet<(StateIdx, Terminal, LRAction)>,
}

impl LRTables {
    pub fn action_at(&self, state: StateIdx, terminal: Terminal) -> Option<LRAction> {
        self.action.get(state, terminal)
    }

    pub fn goto_at(&self, state: StateIdx, nt: NT) -> Option<StateIdx> {
        self.goto.get(state, nt)
    }

    // in the order they were hit during construction
    pub fn conflicts(&self) -> &[TableConflict] {
        &self.conflicts
    }

    pub fn is_deterministic(&self) -> bool {
        self.conflicts.is_empty()
    }

    fn insert_state(&mut self, state: &State, grammar: &Grammar) -> Result<(), TableError> {
        for item in &state.items {
            let registered = if item.is_completed() {
                let action = completed_action(state, item, grammar)?;
                let terminal = match action {
                    LRAction::Accept => Terminal::TERMINATE,
                    _ => item.lookahead,
                };
                self.action.register(state.index, action, terminal)
            } else {
                match item.next_symbol() {
                    None | Some(Symbol::Epsilon) => continue,
                    Some(Symbol::Nonterminal(nt)) => {
                        let target = successor(state, Symbol::Nonterminal(nt))?;
                        self.goto.register(state.index, target, nt);
                        Ok(())
                    }
                    Some(Symbol::Terminal(terminal)) => {
                        let target = successor(state, Symbol::Terminal(terminal))?;
                        self.action
                            .register(state.index, LRAction::Shift(target), terminal)
                    }
                }
            };

            // several lookahead copies of an item can hit the same cell
            if let Err(conflict) = registered {
                let key = (conflict.state, conflict.terminal, conflict.rejected);
                if self.seen_conflicts.insert(key) {
                    warn!("{}", conflict);
                    self.conflicts.push(conflict);
                }
            }
        }

        Ok(())
    }
}

fn successor(state: &State, symbol: Symbol) -> Result<StateIdx, TableError> {
    state
        .successor(&symbol)
        .ok_or(TableError::MissingTransition {
            state: state.index,
            symbol,
        })
}

fn completed_action(
    state: &State,
    item: &LR1Item,
    grammar: &Grammar,
) -> Result<LRAction, TableError> {
    if item.lookahead.is_terminate() && item.production == *grammar.augmented_production() {
        return Ok(LRAction::Accept);
    }

    grammar
        .index_of(&item.production)
        .map(LRAction::Reduce)
        .ok_or_else(|| TableError::UnknownProduction {
            state: state.index,
            production: item.production.clone(),
        })
}

// Fills ACTION and GOTO from a finished canonical collection. Conflicts don't
// stop construction, they are collected on the result.
pub fn build_tables(automaton: &Automaton, grammar: &Grammar) -> Result<LRTables, TableError> {
    let mut tables = LRTables::default();
    for state in automaton.states() {
        tables.insert_state(state, grammar)?;
    }

    debug!(
        "built tables for {} states: {} actions, {} gotos, {} conflicts",
        automaton.len(),
        tables.action.len(),
        tables.goto.len(),
        tables.conflicts.len()
    );
    Ok(tables)
}

#[cfg(test)]
mod lr_tests;
