use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

pub type NT = usize;

// terminals are plain ids handed out by the lexer stage; names live in the grammar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Terminal(pub u32);

impl Terminal {
    // end of input
    pub const TERMINATE: Terminal = Terminal(u32::MAX);

    pub fn is_terminate(self) -> bool {
        self == Terminal::TERMINATE
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminate() {
            write!(f, "$")
        } else {
            write!(f, "t{}", self.0)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Terminal),
    Nonterminal(NT),
    // marks an empty derivation, never shifted or goto'd on
    Epsilon,
}

impl Symbol {
    pub fn is_epsilon(&self) -> bool {
        matches!(self, Symbol::Epsilon)
    }
}

impl From<Terminal> for Symbol {
    fn from(value: Terminal) -> Self {
        Symbol::Terminal(value)
    }
}

/// A single rule `lhs -> body`. Two productions are the same production iff
/// their left-hand sides and bodies are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Production {
    pub lhs: NT,
    pub body: Vec<Symbol>,
}

impl Production {
    pub fn new(lhs: NT, body: Vec<Symbol>) -> Self {
        Self { lhs, body }
    }

    // `lhs -> ε`
    pub fn empty(lhs: NT) -> Self {
        Self {
            lhs,
            body: vec![Symbol::Epsilon],
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.iter().all(Symbol::is_epsilon)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("augmented production index {0} is out of range")]
    MissingAugmentedProduction(usize),
    #[error("production {index} duplicates production {first}")]
    DuplicateProduction { index: usize, first: usize },
    #[error("production {index} refers to undeclared nonterminal {nt}")]
    UndeclaredNonterminal { index: usize, nt: NT },
    #[error("production {index} refers to undeclared terminal {terminal}")]
    UndeclaredTerminal { index: usize, terminal: Terminal },
}

/// Grammar metadata consumed by the table builder: the production list, the
/// production -> index mapping used as the reduce operand, and the augmented
/// start production `S' -> S`.
#[derive(Debug, Clone)]
pub struct Grammar {
    productions: Vec<Production>,
    production_index: HashMap<Production, usize>,
    augmented: usize,
    nonterminal_names: Vec<String>,
    terminal_names: Vec<String>,
}

impl Grammar {
    pub fn new(
        nonterminal_names: Vec<String>,
        terminal_names: Vec<String>,
        productions: Vec<Production>,
        augmented: usize,
    ) -> Result<Self, GrammarError> {
        if augmented >= productions.len() {
            return Err(GrammarError::MissingAugmentedProduction(augmented));
        }

        let mut production_index = HashMap::with_capacity(productions.len());
        for (index, production) in productions.iter().enumerate() {
            if production.lhs >= nonterminal_names.len() {
                return Err(GrammarError::UndeclaredNonterminal {
                    index,
                    nt: production.lhs,
                });
            }

            for symbol in &production.body {
                match *symbol {
                    Symbol::Nonterminal(nt) if nt >= nonterminal_names.len() => {
                        return Err(GrammarError::UndeclaredNonterminal { index, nt });
                    }
                    Symbol::Terminal(terminal)
                        if !terminal.is_terminate()
                            && terminal.0 as usize >= terminal_names.len() =>
                    {
                        return Err(GrammarError::UndeclaredTerminal { index, terminal });
                    }
                    _ => {}
                }
            }

            if let Some(&first) = production_index.get(production) {
                return Err(GrammarError::DuplicateProduction { index, first });
            }
            production_index.insert(production.clone(), index);
        }

        Ok(Self {
            productions,
            production_index,
            augmented,
            nonterminal_names,
            terminal_names,
        })
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, index: usize) -> Option<&Production> {
        self.productions.get(index)
    }

    // stable index of a production, compared structurally
    pub fn index_of(&self, production: &Production) -> Option<usize> {
        self.production_index.get(production).copied()
    }

    pub fn augmented_production(&self) -> &Production {
        &self.productions[self.augmented]
    }

    pub fn augmented_index(&self) -> usize {
        self.augmented
    }

    pub fn n_nonterminals(&self) -> usize {
        self.nonterminal_names.len()
    }

    pub fn n_terminals(&self) -> usize {
        self.terminal_names.len()
    }

    pub fn is_nonterminal(&self, symbol: &Symbol) -> bool {
        match symbol {
            Symbol::Nonterminal(nt) => *nt < self.nonterminal_names.len(),
            _ => false,
        }
    }

    pub fn terminal_name(&self, terminal: Terminal) -> String {
        if terminal.is_terminate() {
            return "$".to_string();
        }
        match self.terminal_names.get(terminal.0 as usize) {
            Some(name) => name.clone(),
            None => terminal.to_string(),
        }
    }

    pub fn nonterminal_name(&self, nt: NT) -> String {
        match self.nonterminal_names.get(nt) {
            Some(name) => name.clone(),
            None => format!("<nt {}>", nt),
        }
    }

    pub fn symbol_name(&self, symbol: &Symbol) -> String {
        match symbol {
            Symbol::Terminal(t) => self.terminal_name(*t),
            Symbol::Nonterminal(nt) => self.nonterminal_name(*nt),
            Symbol::Epsilon => "ε".to_string(),
        }
    }

    pub fn display_production(&self, production: &Production) -> String {
        let body: Vec<String> = production
            .body
            .iter()
            .map(|symbol| self.symbol_name(symbol))
            .collect();
        format!(
            "{} -> {}",
            self.nonterminal_name(production.lhs),
            body.join(" ")
        )
    }
}
