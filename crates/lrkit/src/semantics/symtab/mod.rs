use std::collections::HashMap;
use std::error::Error as StdError;

use log::trace;
use lrkit_util::{make_type_idx, words_for};
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

pub type Address = u32;

// start of writable data space
pub const DATA_BASE: Address = 0x1000_0000;
pub const CONSTANT_BASE: Address = 0x2000_0000;
pub const WORD_SIZE: u32 = 4;

make_type_idx!(pub ScopeId, Scope);

pub type HookError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SymtabError {
    #[error("no open scope")]
    NoOpenScope,
    #[error("symbol `{0}` already declared in this scope")]
    DuplicateDeclaration(String),
    #[error("invalid size for symbol `{0}`")]
    InvalidDeclarationSize(String),
    #[error("symbol `{0}` not found in any scope")]
    UnresolvedName(String),
    #[error("address space exhausted while allocating {0} bytes")]
    AddressOverflow(u64),
    #[error("word size must be non-zero")]
    InvalidWordSize,
    #[error(transparent)]
    HookFailed(HookError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Variable,
    Array,
    Constant,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableItem {
    pub name: String,
    pub kind: ItemKind,
    // filled in by the table on registration, never by the caller
    pub address: Option<Address>,
    pub underlying_type: Option<String>,
    // bytes per element
    pub size: u32,
    // 1 for everything that is not an array
    pub array_len: u32,
    pub line: u32,
    pub column: u32,
}

impl SymbolTableItem {
    pub fn variable(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            kind: ItemKind::Variable,
            address: None,
            underlying_type: None,
            size,
            array_len: 1,
            line: 0,
            column: 0,
        }
    }

    pub fn array(name: impl Into<String>, size: u32, array_len: u32) -> Self {
        Self {
            kind: ItemKind::Array,
            array_len,
            ..Self::variable(name, size)
        }
    }

    pub fn constant(name: impl Into<String>, size: u32) -> Self {
        Self {
            kind: ItemKind::Constant,
            ..Self::variable(name, size)
        }
    }

    pub fn with_type(mut self, underlying_type: impl Into<String>) -> Self {
        self.underlying_type = Some(underlying_type.into());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    // bytes the item occupies in data space
    fn footprint(&self) -> Option<u64> {
        match self.kind {
            ItemKind::Variable => Some(u64::from(self.size)),
            ItemKind::Array => Some(u64::from(self.size) * u64::from(self.array_len)),
            ItemKind::Constant | ItemKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: ScopeId,
    pub level: usize,
    pub parent: Option<ScopeId>,
    items: HashMap<String, SymbolTableItem>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&SymbolTableItem> {
        self.items.get(name)
    }

    pub fn items(&self) -> impl Iterator<Item = &SymbolTableItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Called with the affected scope whenever a scope is entered or exited,
/// e.g. to emit scope markers into intermediate code.
pub trait ScopeHook {
    fn on_scope(&mut self, scope: &Scope) -> Result<(), HookError>;
}

impl<F> ScopeHook for F
where
    F: FnMut(&Scope) -> Result<(), HookError>,
{
    fn on_scope(&mut self, scope: &Scope) -> Result<(), HookError> {
        self(scope)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymtabConfig {
    pub data_base: Address,
    pub constant_base: Address,
    pub word_size: u32,
}

impl Default for SymtabConfig {
    fn default() -> Self {
        Self {
            data_base: DATA_BASE,
            constant_base: CONSTANT_BASE,
            word_size: WORD_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub item: &'a SymbolTableItem,
    pub scope: ScopeId,
    pub in_current_scope: bool,
}

// Scopes are never freed: `scopes` is the append-only history in creation
// order, and parent links index into it. Only `current` and the parent chain
// decide what is visible.
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: Option<ScopeId>,

    enter_hook: Option<Box<dyn ScopeHook>>,
    exit_hook: Option<Box<dyn ScopeHook>>,

    word_size: u32,
    data_addr: Address,
    // tracked, not yet used for allocation
    constant_addr: Address,
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("scopes", &self.scopes)
            .field("current", &self.current)
            .field("word_size", &self.word_size)
            .field("data_addr", &self.data_addr)
            .field("constant_addr", &self.constant_addr)
            .finish_non_exhaustive()
    }
}

impl SymbolTable {
    pub fn new(config: SymtabConfig) -> Result<Self, SymtabError> {
        if config.word_size == 0 {
            return Err(SymtabError::InvalidWordSize);
        }

        Ok(Self {
            scopes: Vec::new(),
            current: None,
            enter_hook: None,
            exit_hook: None,
            word_size: config.word_size,
            data_addr: config.data_base,
            constant_addr: config.constant_base,
        })
    }

    pub fn with_enter_hook(mut self, hook: impl ScopeHook + 'static) -> Self {
        self.enter_hook = Some(Box::new(hook));
        self
    }

    pub fn with_exit_hook(mut self, hook: impl ScopeHook + 'static) -> Self {
        self.exit_hook = Some(Box::new(hook));
        self
    }

    pub fn current_scope(&self) -> Option<&Scope> {
        self.current.map(|id| &self.scopes[id])
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.get_inner())
    }

    // every scope ever created, in creation order
    pub fn scope_history(&self) -> &[Scope] {
        &self.scopes
    }

    // number of open scopes
    pub fn depth(&self) -> usize {
        self.current_scope().map_or(0, |scope| scope.level + 1)
    }

    pub fn next_data_address(&self) -> Address {
        self.data_addr
    }

    pub fn constant_base(&self) -> Address {
        self.constant_addr
    }

    pub fn enter_scope(&mut self) -> Result<ScopeId, SymtabError> {
        let id = ScopeId::new(self.scopes.len());
        let (level, parent) = match self.current_scope() {
            Some(current) => (current.level + 1, Some(current.id)),
            None => (0, None),
        };

        self.scopes.push(Scope {
            id,
            level,
            parent,
            items: HashMap::new(),
        });
        self.current = Some(id);
        trace!("enter scope {} at level {}", id, level);

        // the scope stays created and current even if the hook fails
        if let Some(hook) = self.enter_hook.as_mut() {
            hook.on_scope(&self.scopes[id])
                .map_err(SymtabError::HookFailed)?;
        }
        Ok(id)
    }

    pub fn exit_scope(&mut self) -> Result<(), SymtabError> {
        let id = self.current.ok_or(SymtabError::NoOpenScope)?;

        if let Some(hook) = self.exit_hook.as_mut() {
            hook.on_scope(&self.scopes[id])
                .map_err(SymtabError::HookFailed)?;
        }

        trace!("exit scope {}", id);
        self.current = self.scopes[id].parent;
        Ok(())
    }

    /// Declares `item` in the current scope and returns the address assigned to
    /// it. Variables and arrays get word-aligned space from the data counter,
    /// other kinds get no address. Names may shadow declarations of enclosing
    /// scopes but not of the current one.
    pub fn register(&mut self, mut item: SymbolTableItem) -> Result<Option<Address>, SymtabError> {
        let id = self.current.ok_or(SymtabError::NoOpenScope)?;

        if self.scopes[id].items.contains_key(&item.name) {
            return Err(SymtabError::DuplicateDeclaration(item.name));
        }
        if item.size == 0 || (item.kind == ItemKind::Array && item.array_len == 0) {
            return Err(SymtabError::InvalidDeclarationSize(item.name));
        }

        item.address = match item.footprint() {
            Some(bytes) => Some(self.allocate(bytes)?),
            None => None,
        };
        trace!(
            "register `{}` ({:?}) in scope {} at {:?}",
            item.name,
            item.kind,
            id,
            item.address
        );

        let address = item.address;
        self.scopes[id].items.insert(item.name.clone(), item);
        Ok(address)
    }

    // constants go through the normal path and get no address yet
    pub fn register_constant(&mut self, mut item: SymbolTableItem) -> Result<(), SymtabError> {
        item.kind = ItemKind::Constant;
        self.register(item).map(|_| ())
    }

    pub fn lookup(&self, name: &str) -> Result<Lookup<'_>, SymtabError> {
        let current = self.current.ok_or(SymtabError::NoOpenScope)?;

        let mut scope = &self.scopes[current];
        loop {
            if let Some(item) = scope.items.get(name) {
                return Ok(Lookup {
                    item,
                    scope: scope.id,
                    in_current_scope: scope.id == current,
                });
            }
            match scope.parent {
                Some(parent) => scope = &self.scopes[parent],
                None => return Err(SymtabError::UnresolvedName(name.to_string())),
            }
        }
    }

    // space for a compiler temporary, shares the counter with named variables
    pub fn temp_addr(&mut self, size: u32) -> Result<Address, SymtabError> {
        if size == 0 {
            return Err(SymtabError::InvalidDeclarationSize("<temporary>".to_string()));
        }
        self.allocate(u64::from(size))
    }

    fn allocate(&mut self, bytes: u64) -> Result<Address, SymtabError> {
        let words = words_for(bytes, self.word_size);
        let next = u64::from(self.data_addr) + words;
        let next = Address::try_from(next).map_err(|_| SymtabError::AddressOverflow(bytes))?;

        let address = self.data_addr;
        self.data_addr = next;
        Ok(address)
    }

    // parent -> child tree over the whole history, for graphviz dumps
    pub fn scope_graph(&self) -> DiGraph<String, ()> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = self
            .scopes
            .iter()
            .map(|scope| {
                let mut names: Vec<&str> = scope.items.keys().map(String::as_str).collect();
                names.sort_unstable();
                graph.add_node(format!(
                    "scope {} (level {}): {}",
                    scope.id,
                    scope.level,
                    names.join(", ")
                ))
            })
            .collect();

        for scope in &self.scopes {
            if let Some(parent) = scope.parent {
                graph.add_edge(nodes[parent.get_inner()], nodes[scope.id.get_inner()], ());
            }
        }
        graph
    }
}
