//! Lexical scopes: symbol tables, namespaces and the object-type registry.

use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    gc::{Expand, ObjectMetadata, Pool, Ptr, Root},
    types::{Identifier, Namespace, ObjectName, ObjectType, Type, promote},
    value::Value,
};

/// Where a looked-up symbol was found, relative to the environment the
/// lookup started in. Drives assignment purity: writing a symbol of an
/// enclosing scope is an external effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    Local,
    Global,
}

/// One candidate produced by [`Environment::poly_lookup`].
///
/// `value` is `None` for slots that were declared but never assigned
/// (placeholders defined during compilation, bare `TYPE name;` members).
pub struct LookupResult {
    pub scope: VariableScope,
    pub vm_type: Type,
    pub value: Option<Root<Value>>,
}

struct EnvData {
    /// Several definitions may share a name as long as their types differ
    /// (overloading); per name, insertion order decides resolution ties.
    table: BTreeMap<Identifier, IndexMap<Type, Option<Ptr<Value>>>>,
    namespaces: AHashMap<Identifier, Ptr<Environment>>,
}

/// A scope. Lookups walk parents; definitions land in the current scope;
/// assignments walk parents to the defining scope. Environments form a
/// parent-chained DAG and live in the GC pool (class instances own their
/// private scope, closures capture theirs).
pub struct Environment {
    parent: Option<Ptr<Environment>>,
    data: RefCell<EnvData>,
    object_types: RefCell<AHashMap<ObjectName, Ptr<ObjectType>>>,
}

impl Environment {
    pub fn new(pool: &Pool) -> Root<Self> {
        pool.new_root(Self {
            parent: None,
            data: RefCell::new(EnvData {
                table: BTreeMap::new(),
                namespaces: AHashMap::new(),
            }),
            object_types: RefCell::new(AHashMap::new()),
        })
    }

    /// Creates a child of `parent`, in the same pool.
    pub fn new_child(parent: Ptr<Environment>) -> Root<Self> {
        let pool = parent.pool();
        parent.protect();
        pool.new_root(Self {
            parent: Some(parent),
            data: RefCell::new(EnvData {
                table: BTreeMap::new(),
                namespaces: AHashMap::new(),
            }),
            object_types: RefCell::new(AHashMap::new()),
        })
    }

    pub fn parent(&self) -> Option<Ptr<Environment>> {
        self.parent.clone()
    }

    /// Returns the namespace environment `name` visible from `parent`,
    /// creating it inside `parent` on first use.
    pub fn new_namespace(parent: &Root<Environment>, name: Identifier) -> Root<Environment> {
        if let Some(existing) =
            Self::lookup_namespace(parent, &Namespace(vec![name.clone()]))
        {
            return existing;
        }
        let namespace_env = Self::new_child(parent.ptr());
        let ptr = namespace_env.ptr();
        ptr.protect();
        parent.value().data.borrow_mut().namespaces.insert(name, ptr);
        namespace_env
    }

    /// Resolves a (possibly nested) namespace, walking parents when the
    /// first component is not found locally.
    pub fn lookup_namespace(source: &Root<Environment>, name: &Namespace) -> Option<Root<Environment>> {
        if let Some(found) = source.value().find_namespace(name) {
            return Some(found.to_root());
        }
        let parent = source.value().parent()?;
        Self::lookup_namespace(&parent.to_root(), name)
    }

    fn find_namespace(&self, name: &Namespace) -> Option<Ptr<Environment>> {
        let mut current: Option<Ptr<Environment>> = None;
        for part in name.iter() {
            let next = match &current {
                None => self.data.borrow().namespaces.get(part).cloned(),
                Some(env) => env.value().data.borrow().namespaces.get(part).cloned(),
            };
            current = Some(next?);
        }
        current
    }

    pub fn define_type(&self, object_type: Ptr<ObjectType>) {
        let name = object_type.value().vm_type().object_name();
        object_type.protect();
        self.object_types.borrow_mut().insert(name, object_type);
    }

    pub fn lookup_object_type(&self, name: &ObjectName) -> Option<Rc<ObjectType>> {
        if let Some(object_type) = self.object_types.borrow().get(name) {
            return Some(object_type.value());
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.value().lookup_object_type(name))
    }

    /// Resolves a type name: the primitive keywords (plus the `int` and
    /// `double` aliases of `number`) or a registered object type.
    pub fn lookup_type(&self, symbol: &Identifier) -> Option<Type> {
        match symbol.as_str() {
            "void" => Some(Type::Void),
            "bool" => Some(Type::Bool),
            "number" | "int" | "double" => Some(Type::Number),
            "string" => Some(Type::String),
            _ => self
                .lookup_object_type(&ObjectName::new(symbol.as_str()))
                .map(|object_type| object_type.vm_type().clone()),
        }
    }

    /// Looks up `symbol` and returns the first overload that promotes to
    /// `expected_type`, already promoted. Uninitialized slots are skipped.
    pub fn lookup(
        &self,
        pool: &Pool,
        symbol_namespace: &Namespace,
        symbol: &Identifier,
        expected_type: &Type,
    ) -> Option<Root<Value>> {
        for candidate in self.poly_lookup(symbol_namespace, symbol) {
            let Some(value) = candidate.value else { continue };
            if let Some(promotion) = promote(&candidate.vm_type, expected_type) {
                return Some(promotion(pool, value));
            }
        }
        None
    }

    /// All definitions of `symbol`, local scope first, then parents.
    pub fn poly_lookup(&self, symbol_namespace: &Namespace, symbol: &Identifier) -> Vec<LookupResult> {
        let mut output = Vec::new();
        self.poly_lookup_into(symbol_namespace, symbol, VariableScope::Local, &mut output);
        output
    }

    fn poly_lookup_into(
        &self,
        symbol_namespace: &Namespace,
        symbol: &Identifier,
        scope: VariableScope,
        output: &mut Vec<LookupResult>,
    ) {
        let search_in = |environment: &Environment| {
            let data = environment.data.borrow();
            data.table
                .get(symbol)
                .map(|overloads| {
                    overloads
                        .iter()
                        .map(|(vm_type, slot)| LookupResult {
                            scope,
                            vm_type: vm_type.clone(),
                            value: slot.as_ref().map(|ptr| ptr.to_root()),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };
        if symbol_namespace.is_empty() {
            output.extend(search_in(self));
        } else if let Some(environment) = self.find_namespace(symbol_namespace) {
            output.extend(search_in(&environment.value()));
        }
        if let Some(parent) = &self.parent {
            parent
                .value()
                .poly_lookup_into(symbol_namespace, symbol, VariableScope::Global, output);
        }
    }

    /// Case-insensitive variant of [`Environment::poly_lookup`], linear in
    /// the number of defined symbols; used for "did you mean" diagnostics.
    pub fn case_insensitive_lookup(
        &self,
        symbol_namespace: &Namespace,
        symbol: &Identifier,
    ) -> Vec<Identifier> {
        let mut output = Vec::new();
        self.case_insensitive_lookup_into(symbol_namespace, symbol, &mut output);
        output
    }

    fn case_insensitive_lookup_into(
        &self,
        symbol_namespace: &Namespace,
        symbol: &Identifier,
        output: &mut Vec<Identifier>,
    ) {
        if symbol_namespace.is_empty() {
            for name in self.data.borrow().table.keys() {
                if name.as_str().eq_ignore_ascii_case(symbol.as_str()) && !output.contains(name) {
                    output.push(name.clone());
                }
            }
        } else if let Some(environment) = self.find_namespace(symbol_namespace) {
            environment
                .value()
                .case_insensitive_lookup_into(&Namespace::empty(), symbol, output);
        }
        if let Some(parent) = &self.parent {
            parent
                .value()
                .case_insensitive_lookup_into(symbol_namespace, symbol, output);
        }
    }

    /// Defines `symbol` in this scope, replacing any previous definition of
    /// the same type.
    pub fn define(&self, symbol: Identifier, value: &Root<Value>) {
        let vm_type = value.value().vm_type().clone();
        let ptr = value.ptr();
        ptr.protect();
        self.data
            .borrow_mut()
            .table
            .entry(symbol)
            .or_default()
            .insert(vm_type, Some(ptr));
    }

    /// Declares `symbol` with a type but no value yet. Lookups skip the slot
    /// until an assignment fills it.
    pub fn define_uninitialized(&self, symbol: Identifier, vm_type: Type) {
        self.data
            .borrow_mut()
            .table
            .entry(symbol)
            .or_default()
            .entry(vm_type)
            .or_insert(None);
    }

    /// Assigns to the scope that defines `symbol`, walking parents.
    ///
    /// # Panics
    /// Panics when no scope defines the symbol; compilation validates the
    /// symbol exists, so this indicates a VM bug rather than a script error.
    pub fn assign(&self, symbol: &Identifier, value: &Root<Value>) {
        let defined_here = self.data.borrow().table.contains_key(symbol);
        if defined_here {
            let vm_type = value.value().vm_type().clone();
            let ptr = value.ptr();
            ptr.protect();
            self.data
                .borrow_mut()
                .table
                .get_mut(symbol)
                .expect("symbol present")
                .insert(vm_type, Some(ptr));
            return;
        }
        match &self.parent {
            Some(parent) => parent.value().assign(symbol, value),
            None => panic!(
                "assignment to undefined symbol `{symbol}` (missed by compilation)"
            ),
        }
    }

    /// Iterates the symbols defined directly in this scope, in name order,
    /// with the type of each overload. Used by class synthesis.
    pub fn for_each_local(&self, mut callback: impl FnMut(&Identifier, &Type)) {
        for (symbol, overloads) in &self.data.borrow().table {
            for vm_type in overloads.keys() {
                callback(symbol, vm_type);
            }
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("symbols", &self.data.borrow().table.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Expand for Environment {
    fn expand(&self) -> Vec<Rc<ObjectMetadata>> {
        let mut output = Vec::new();
        if let Some(parent) = &self.parent {
            output.push(parent.object_metadata());
        }
        let data = self.data.borrow();
        for overloads in data.table.values() {
            for slot in overloads.values() {
                if let Some(value) = slot {
                    output.push(value.object_metadata());
                }
            }
        }
        for namespace in data.namespaces.values() {
            output.push(namespace.object_metadata());
        }
        for object_type in self.object_types.borrow().values() {
            output.push(object_type.object_metadata());
        }
        output
    }
}
