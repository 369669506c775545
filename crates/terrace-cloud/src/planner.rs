//! Plan generation: diff declared resources against recorded state

use crate::graph::{self, ResourceGraph};
use crate::plan::{Action, Operation, Plan};
use crate::reference;
use crate::resource::{Properties, Resource};
use crate::state::{ActualStateRecord, ResourceStatus, StateSnapshot};
use std::collections::{BTreeMap, BTreeSet};

/// Checksum of a resource's declaration (`blake3:<hex>`).
pub fn checksum(resource: &Resource) -> String {
    checksum_of(&resource.kind, &resource.properties)
}

/// Checksum of a kind and property set.
///
/// Properties are hashed as compact JSON of a sorted map, so key order in
/// the source document does not matter.
pub fn checksum_of(kind: &str, properties: &Properties) -> String {
    let body: serde_json::Map<String, serde_json::Value> = properties
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"\0");
    hasher.update(serde_json::Value::Object(body).to_string().as_bytes());
    format!("blake3:{}", hasher.finalize().to_hex())
}

/// Build the plan for `graph` against `prior`.
///
/// A resource referencing (`${name.id}`) something that is being created
/// is updated even when its own declaration is unchanged.
pub fn plan(graph: &ResourceGraph, prior: &StateSnapshot) -> Plan {
    let mut operations = Vec::with_capacity(graph.len());
    let mut created: BTreeSet<String> = BTreeSet::new();

    for name in graph.topological_order() {
        let Some(resource) = graph.get(&name) else {
            continue;
        };
        let checksum = checksum(resource);
        let record = prior.get(&name);
        let mut action = decide(record, &checksum);
        if action == Action::NoOp
            && reference::references(&resource.properties)
                .iter()
                .any(|r| created.contains(r))
        {
            action = Action::Update;
        }
        if action == Action::Create {
            created.insert(name.clone());
        }
        let depends_on = graph
            .dependencies(&name)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();

        operations.push(Operation {
            target: name,
            kind: resource.kind.clone(),
            action,
            properties: resource.properties.clone(),
            checksum: Some(checksum),
            depends_on,
            prior: record.cloned(),
        });
    }

    operations.extend(plan_deletes(graph, prior));

    let plan = Plan::new(operations);
    tracing::debug!("Planned: {}", plan.summary());
    plan
}

fn decide(record: Option<&ActualStateRecord>, checksum: &str) -> Action {
    let Some(record) = record else {
        return Action::Create;
    };
    if record.status == ResourceStatus::Absent || record.external_id.is_none() {
        return Action::Create;
    }
    // Failed or interrupted: converge again even if the checksum matches.
    if record.status != ResourceStatus::Active {
        return Action::Update;
    }
    if record.checksum.as_deref() == Some(checksum) {
        Action::NoOp
    } else {
        Action::Update
    }
}

/// Deletes for recorded resources that are no longer declared, dependents first.
fn plan_deletes(graph: &ResourceGraph, prior: &StateSnapshot) -> Vec<Operation> {
    let doomed: BTreeMap<String, BTreeSet<String>> = prior
        .iter()
        .filter(|(name, record)| !graph.contains(name) && record.status != ResourceStatus::Absent)
        .map(|(name, record)| (name.clone(), record.depends_on.iter().cloned().collect()))
        .collect();

    let (mut order, leftover) = graph::kahn_order(&doomed);
    if !leftover.is_empty() {
        tracing::warn!(
            "Recorded dependencies form a cycle among {}; deleting them in name order",
            leftover.join(", ")
        );
        order.extend(leftover);
    }
    order.reverse();

    order
        .into_iter()
        .filter_map(|name| {
            let record = prior.get(&name)?;
            Some(Operation {
                kind: record.kind.clone(),
                action: Action::Delete,
                properties: record.properties.clone(),
                checksum: None,
                depends_on: record.depends_on.clone(),
                prior: Some(record.clone()),
                target: name,
            })
        })
        .collect()
}
