use std::collections::HashMap;

use bit_set::BitSet;
use lrkit_util::make_type_idx;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use super::grammar::{Grammar, Production, Symbol, Terminal};

make_type_idx!(pub StateIdx, State);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LR1Item {
    pub production: Production,
    pub dot_position: usize,
    // ignored by LR(0) construction, but always carried
    pub lookahead: Terminal,
}

impl LR1Item {
    pub fn new(production: Production, dot_position: usize, lookahead: Terminal) -> Self {
        debug_assert!(dot_position <= production.len());
        Self {
            production,
            dot_position,
            lookahead,
        }
    }

    // symbol right after the dot, None once the dot reached the end
    pub fn next_symbol(&self) -> Option<Symbol> {
        self.production.body.get(self.dot_position).copied()
    }

    pub fn is_completed(&self) -> bool {
        match self.next_symbol() {
            None => true,
            Some(symbol) => symbol.is_epsilon(),
        }
    }
}

/// One state of the canonical collection. Built by the grammar analysis stage,
/// only read here.
#[derive(Clone, Debug)]
pub struct State {
    pub index: StateIdx,
    pub items: Vec<LR1Item>,
    pub transitions: HashMap<Symbol, StateIdx>,
}

impl State {
    pub fn new(index: StateIdx) -> Self {
        Self {
            index,
            items: Vec::new(),
            transitions: HashMap::new(),
        }
    }

    pub fn with_item(mut self, item: LR1Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_transition(mut self, symbol: Symbol, target: StateIdx) -> Self {
        self.transitions.insert(symbol, target);
        self
    }

    pub fn successor(&self, symbol: &Symbol) -> Option<StateIdx> {
        self.transitions.get(symbol).copied()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AutomatonError {
    #[error("state at position {position} carries index {index}")]
    MisplacedState { position: usize, index: StateIdx },
    #[error("state {state} has a transition to missing state {target}")]
    DanglingTransition { state: StateIdx, target: StateIdx },
    #[error("state {0} has a transition on epsilon")]
    EpsilonTransition(StateIdx),
}

// state 0 is the initial state
#[derive(Clone, Debug, Default)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    pub fn new(states: Vec<State>) -> Result<Self, AutomatonError> {
        for (position, state) in states.iter().enumerate() {
            if state.index.get_inner() != position {
                return Err(AutomatonError::MisplacedState {
                    position,
                    index: state.index,
                });
            }
        }

        for state in &states {
            for (symbol, target) in &state.transitions {
                if symbol.is_epsilon() {
                    return Err(AutomatonError::EpsilonTransition(state.index));
                }
                if target.get_inner() >= states.len() {
                    return Err(AutomatonError::DanglingTransition {
                        state: state.index,
                        target: *target,
                    });
                }
            }
        }

        Ok(Self { states })
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, idx: StateIdx) -> Option<&State> {
        self.states.get(idx.get_inner())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    // states no transition path from state 0 reaches
    pub fn unreachable_states(&self) -> Vec<StateIdx> {
        if self.states.is_empty() {
            return Vec::new();
        }

        let mut visited = BitSet::with_capacity(self.states.len());
        let mut stack = vec![0usize];
        visited.insert(0);
        while let Some(current) = stack.pop() {
            for target in self.states[current].transitions.values() {
                if visited.insert(target.get_inner()) {
                    stack.push(target.get_inner());
                }
            }
        }

        (0..self.states.len())
            .filter(|idx| !visited.contains(*idx))
            .map(StateIdx::new)
            .collect()
    }

    // transition graph for graphviz output, edges labelled with symbol names
    pub fn to_graph(&self, grammar: &Grammar) -> DiGraph<String, String> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = self
            .states
            .iter()
            .map(|state| graph.add_node(format!("I{}", state.index)))
            .collect();

        for state in &self.states {
            // sort so the output does not depend on hash order
            let mut edges: Vec<_> = state.transitions.iter().collect();
            edges.sort();
            for (symbol, target) in edges {
                graph.add_edge(
                    nodes[state.index.get_inner()],
                    nodes[target.get_inner()],
                    grammar.symbol_name(symbol),
                );
            }
        }

        graph
    }
}
