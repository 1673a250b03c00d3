//! Module dependency graph of one entry.

use super::resolve::Resolved;
use crate::transform::TypeDeclaration;
use std::collections::{HashMap, VecDeque};

/// Index of a module in the graph.
pub type ModuleId = usize;

/// A transformed module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Root-relative key, `/`-separated.
    pub key: String,
    /// Output of the module's transform chain.
    pub code: String,
    pub declarations: Vec<TypeDeclaration>,
    /// Specifiers in source order with their resolution.
    pub imports: Vec<(String, Resolved)>,
    /// Keys of other files the transform read, such as Sass partials.
    pub loaded_files: Vec<String>,
    pub dependencies: Vec<ModuleId>,
}

/// Modules in discovery order (the entry is always id 0).
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    key_to_id: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: Module) -> ModuleId {
        let id = self.modules.len();
        self.key_to_id.insert(module.key.clone(), id);
        self.modules.push(module);
        id
    }

    #[must_use]
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    #[must_use]
    pub fn id_by_key(&self, key: &str) -> Option<ModuleId> {
        self.key_to_id.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Fill every module's `dependencies` from its resolved imports.
    pub fn link(&mut self) {
        let key_to_id = &self.key_to_id;
        for module in &mut self.modules {
            module.dependencies = module
                .imports
                .iter()
                .filter_map(|(_, resolved)| match resolved {
                    Resolved::Module(key) => key_to_id.get(key).copied(),
                    Resolved::External(_) => None,
                })
                .collect();
        }
    }

    /// Modules with dependencies before dependents. Cycles are broken by
    /// appending the remaining modules in discovery order.
    #[must_use]
    pub fn toposort(&self) -> Vec<ModuleId> {
        let n = self.modules.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<ModuleId>> = vec![Vec::new(); n];

        for (id, module) in self.modules.iter().enumerate() {
            for &dep in &module.dependencies {
                dependents[dep].push(id);
                in_degree[id] += 1;
            }
        }

        let mut queue: VecDeque<ModuleId> = (0..n).filter(|&id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &next in &dependents[id] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < n {
            let mut placed = vec![false; n];
            for &id in &order {
                placed[id] = true;
            }
            order.extend((0..n).filter(|&id| !placed[id]));
        }

        order
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate()
    }
}
