use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, bail, Context, Result};
use lrkit::parser::automaton::{Automaton, LR1Item, State, StateIdx};
use lrkit::parser::grammar::{Grammar, Production, Symbol, Terminal};
use serde::Deserialize;

const END_MARKER: &str = "$";

// json description of a grammar plus its canonical collection, symbols by name
#[derive(Debug, Deserialize)]
pub(crate) struct Input {
    pub(crate) nonterminals: Vec<String>,
    pub(crate) terminals: Vec<String>,
    pub(crate) productions: Vec<ProductionDef>,
    #[serde(default)]
    pub(crate) augmented: usize,
    pub(crate) states: Vec<StateDef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductionDef {
    pub(crate) lhs: String,
    // empty body means `lhs -> ε`
    #[serde(default)]
    pub(crate) body: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StateDef {
    pub(crate) items: Vec<ItemDef>,
    #[serde(default)]
    pub(crate) transitions: BTreeMap<String, usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemDef {
    pub(crate) production: usize,
    pub(crate) dot: usize,
    #[serde(default = "end_marker")]
    pub(crate) lookahead: String,
}

fn end_marker() -> String {
    END_MARKER.to_string()
}

struct SymbolNames(HashMap<String, Symbol>);

impl SymbolNames {
    fn new(nonterminals: &[String], terminals: &[String]) -> Result<Self> {
        let mut names = HashMap::new();
        names.insert(END_MARKER.to_string(), Symbol::Terminal(Terminal::TERMINATE));
        for (nt, name) in nonterminals.iter().enumerate() {
            if names.insert(name.clone(), Symbol::Nonterminal(nt)).is_some() {
                bail!("symbol `{}` declared twice", name);
            }
        }
        for (t, name) in terminals.iter().enumerate() {
            let terminal = Terminal(u32::try_from(t).context("too many terminals")?);
            if names.insert(name.clone(), Symbol::Terminal(terminal)).is_some() {
                bail!("symbol `{}` declared twice", name);
            }
        }
        Ok(Self(names))
    }

    fn symbol(&self, name: &str) -> Result<Symbol> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("undeclared symbol `{}`", name))
    }

    fn nonterminal(&self, name: &str) -> Result<usize> {
        match self.symbol(name)? {
            Symbol::Nonterminal(nt) => Ok(nt),
            _ => bail!("`{}` is not a nonterminal", name),
        }
    }

    fn terminal(&self, name: &str) -> Result<Terminal> {
        match self.symbol(name)? {
            Symbol::Terminal(t) => Ok(t),
            _ => bail!("`{}` is not a terminal", name),
        }
    }
}

impl Input {
    pub(crate) fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("malformed input description")
    }

    pub(crate) fn into_parts(self) -> Result<(Grammar, Automaton)> {
        let names = SymbolNames::new(&self.nonterminals, &self.terminals)?;

        let productions = self
            .productions
            .iter()
            .enumerate()
            .map(|(i, def)| -> Result<Production> {
                let lhs = names.nonterminal(&def.lhs)?;
                if def.body.is_empty() {
                    return Ok(Production::empty(lhs));
                }
                let body = def
                    .body
                    .iter()
                    .map(|name| names.symbol(name))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("in production {}", i))?;
                Ok(Production::new(lhs, body))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut states = Vec::with_capacity(self.states.len());
        for (i, def) in self.states.iter().enumerate() {
            let mut state = State::new(StateIdx::new(i));
            for item in &def.items {
                let production = productions.get(item.production).ok_or_else(|| {
                    anyhow!("state {} uses unknown production {}", i, item.production)
                })?;
                if item.dot > production.len() {
                    bail!(
                        "state {}: dot {} is past the end of production {}",
                        i,
                        item.dot,
                        item.production
                    );
                }
                let lookahead = names.terminal(&item.lookahead)?;
                state = state.with_item(LR1Item::new(production.clone(), item.dot, lookahead));
            }
            for (name, target) in &def.transitions {
                let target = StateIdx::try_new(*target)
                    .ok_or_else(|| anyhow!("state {}: target {} out of range", i, target))?;
                state = state.with_transition(names.symbol(name)?, target);
            }
            states.push(state);
        }

        let grammar = Grammar::new(self.nonterminals, self.terminals, productions, self.augmented)?;
        let automaton = Automaton::new(states)?;
        Ok((grammar, automaton))
    }
}
