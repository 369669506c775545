//! Resource dependency graph
//!
//! Built once per run from the declared resources and immutable afterwards.
//! Edges come from explicit `depends_on` lists and from `${name.id}`
//! references inside properties. Construction rejects duplicate names,
//! dangling edges and cycles; the topological order uses Kahn's algorithm
//! with ascending-name tie-breaking so identical input always yields the
//! same plan.

use crate::error::ValidationError;
use crate::reference;
use crate::resource::Resource;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Validated, acyclic set of resources
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    resources: BTreeMap<String, Resource>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

impl ResourceGraph {
    /// Validate `resources` and build the graph.
    pub fn build(resources: Vec<Resource>) -> Result<Self, ValidationError> {
        let mut by_name: BTreeMap<String, Resource> = BTreeMap::new();
        for resource in resources {
            if resource.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if resource.kind.trim().is_empty() {
                return Err(ValidationError::EmptyKind(resource.name));
            }
            if by_name.contains_key(&resource.name) {
                return Err(ValidationError::DuplicateName(resource.name));
            }
            by_name.insert(resource.name.clone(), resource);
        }

        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut dependents: BTreeMap<String, BTreeSet<String>> = by_name
            .keys()
            .map(|name| (name.clone(), BTreeSet::new()))
            .collect();

        for (name, resource) in &by_name {
            let mut deps: BTreeSet<String> = resource.depends_on.iter().cloned().collect();
            deps.extend(reference::references(&resource.properties));

            for dep in &deps {
                if dep == name {
                    return Err(ValidationError::SelfDependency(name.clone()));
                }
                match dependents.get_mut(dep) {
                    Some(set) => {
                        set.insert(name.clone());
                    }
                    None => {
                        return Err(ValidationError::UnknownDependency {
                            resource: name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
            dependencies.insert(name.clone(), deps);
        }

        if let Some(path) = find_cycle(&dependencies) {
            return Err(ValidationError::Cycle { path });
        }

        let (order, _) = kahn_order(&dependencies);
        tracing::debug!("Built resource graph with {} resources", order.len());

        Ok(Self {
            resources: by_name,
            dependencies,
            dependents,
            order,
        })
    }

    /// Names ordered so that every resource follows all of its dependencies.
    pub fn topological_order(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    /// Direct dependencies, explicit and implied by references.
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(name)
    }

    /// Resources that depend directly on `name`.
    pub fn dependents(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.dependents.get(name)
    }

    /// Everything that depends on `name`, directly or transitively.
    pub fn transitive_dependents(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([name]);
        while let Some(current) = queue.pop_front() {
            if let Some(direct) = self.dependents.get(current) {
                for dependent in direct {
                    if seen.insert(dependent.clone()) {
                        queue.push_back(dependent);
                    }
                }
            }
        }
        seen
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first search with unvisited / in-progress / done marks.
///
/// Returns the first cycle found as `a -> b -> ... -> a`.
fn find_cycle(dependencies: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();

    for name in dependencies.keys() {
        if !marks.contains_key(name.as_str()) {
            if let Some(cycle) = visit(name, dependencies, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    dependencies: &'a BTreeMap<String, BTreeSet<String>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    marks.insert(node, Mark::InProgress);
    stack.push(node);

    if let Some(deps) = dependencies.get(node) {
        for dep in deps {
            match marks.get(dep.as_str()) {
                Some(Mark::InProgress) => {
                    let start = stack.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|n| n.to_string()).collect();
                    path.push(dep.clone());
                    return Some(path);
                }
                Some(Mark::Done) => {}
                None => {
                    if let Some(cycle) = visit(dep, dependencies, marks, stack) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    None
}

/// Kahn's algorithm over `dependencies` (node → nodes it waits for).
///
/// Edges pointing outside the key set are ignored. Returns the order and the
/// nodes left over because they sit on a cycle.
pub(crate) fn kahn_order(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> (Vec<String>, Vec<String>) {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (name, deps) in dependencies {
        let known = deps
            .iter()
            .filter(|d| dependencies.contains_key(d.as_str()));
        let mut count = 0;
        for dep in known {
            adjacency.entry(dep.as_str()).or_default().push(name.as_str());
            count += 1;
        }
        in_degree.insert(name.as_str(), count);
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();

    let mut order = Vec::with_capacity(dependencies.len());
    while let Some(current) = ready.pop_first() {
        order.push(current.to_string());
        if let Some(next) = adjacency.get(current) {
            for neighbor in next {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*neighbor);
                    }
                }
            }
        }
    }

    let leftover = in_degree
        .iter()
        .filter(|(_, d)| **d > 0)
        .map(|(n, _)| n.to_string())
        .collect();
    (order, leftover)
}
