//! Determines the execution order of systems.
//!
//! Systems run in registration order.
//! Explicit `before`/`after` constraints move a system after the systems it depends on;
//! among the systems whose dependencies have all run,
//! the one registered first runs first.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::{iter, mem};

use itertools::Itertools;

use crate::entity::SampleId;
use crate::error::{Error, Result};
use crate::system::{Spec, System};


/// A registered system.
pub(crate) struct Entry {
    pub(crate) system: Box<dyn System>,
    pub(crate) spec:   Spec,
    pub(crate) sample: SampleId,
    registration:      u64,
}

/// The registered systems in execution order.
#[derive(Default)]
pub(crate) struct Schedule {
    entries:           Vec<Entry>,
    next_registration: u64,
}

impl Schedule {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.spec.name == name)
    }

    pub(crate) fn len(&self) -> usize { self.entries.len() }

    /// Names of the systems in execution order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.spec.name.as_str())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> + '_ {
        self.entries.iter_mut()
    }

    fn registration_order(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.iter().collect();
        entries.sort_by_key(|entry| entry.registration);
        entries
    }

    /// Adds a system and recomputes the order.
    pub(crate) fn insert(
        &mut self,
        system: Box<dyn System>,
        spec: Spec,
        sample: SampleId,
    ) -> Result<()> {
        let order = {
            let mut specs: Vec<&Spec> =
                self.registration_order().into_iter().map(|entry| &entry.spec).collect();
            specs.push(&spec);
            plan(&specs)?
        };

        let mut entries = mem::take(&mut self.entries);
        entries.sort_by_key(|entry| entry.registration);
        entries.push(Entry { system, spec, sample, registration: self.next_registration });
        self.next_registration += 1;

        self.entries = permute(entries, &order);
        Ok(())
    }

    /// Removes the named system and recomputes the order.
    pub(crate) fn remove(&mut self, name: &str) -> Result<Option<Entry>> {
        let position = match self.entries.iter().position(|entry| entry.spec.name == name) {
            Some(position) => position,
            None => return Ok(None),
        };

        let order = {
            let specs: Vec<&Spec> = self
                .registration_order()
                .into_iter()
                .filter(|entry| entry.spec.name != name)
                .map(|entry| &entry.spec)
                .collect();
            plan(&specs)?
        };

        let removed = self.entries.remove(position);

        let mut entries = mem::take(&mut self.entries);
        entries.sort_by_key(|entry| entry.registration);
        self.entries = permute(entries, &order);

        Ok(Some(removed))
    }
}

fn permute(entries: Vec<Entry>, order: &[usize]) -> Vec<Entry> {
    let mut slots: Vec<Option<Entry>> = entries.into_iter().map(Some).collect();
    order
        .iter()
        .map(|&index| {
            slots
                .get_mut(index)
                .and_then(Option::take)
                .expect("order should be a permutation of the entries")
        })
        .collect()
}

/// Computes the execution order of systems given in registration order.
///
/// Returns indices into `specs`.
pub(crate) fn plan(specs: &[&Spec]) -> Result<Vec<usize>> {
    let names: HashMap<&str, usize> =
        specs.iter().enumerate().map(|(index, spec)| (spec.name.as_str(), index)).collect();

    let dependents = build_dependents_map(specs, &names);
    scan_cycles(&dependents, |node| specs[node].name.clone())?;
    Ok(sort_stable(&dependents))
}

/// If `dependents[a].contains(b)`, `b` runs after `a`.
fn build_dependents_map(specs: &[&Spec], names: &HashMap<&str, usize>) -> Vec<Vec<usize>> {
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];

    for (node, spec) in specs.iter().enumerate() {
        for name in &spec.before {
            match names.get(name.as_str()) {
                Some(&later) => {
                    dependents.get_mut(node).expect("invalid node index").push(later);
                }
                None => log::debug!(
                    "Ignoring constraint of system {} before unknown system {name}",
                    spec.name
                ),
            }
        }

        for name in &spec.after {
            match names.get(name.as_str()) {
                Some(&earlier) => {
                    dependents.get_mut(earlier).expect("invalid node index").push(node);
                }
                None => log::debug!(
                    "Ignoring constraint of system {} after unknown system {name}",
                    spec.name
                ),
            }
        }
    }

    dependents
}

fn scan_cycles(dependents: &[Vec<usize>], describe_node: impl Fn(usize) -> String) -> Result<()> {
    let mut remaining: BTreeSet<usize> = (0..dependents.len()).collect();
    let mut exited = HashSet::new();
    let mut stack = Vec::new();

    while let Some(&node) = remaining.iter().next() {
        scan_cycles_from(dependents, node, &mut remaining, &mut exited, &mut stack, &describe_node)?;
    }

    Ok(())
}

fn scan_cycles_from(
    dependents: &[Vec<usize>],
    node: usize,
    remaining: &mut BTreeSet<usize>,
    exited: &mut HashSet<usize>,
    stack: &mut Vec<usize>,
    describe_node: &impl Fn(usize) -> String,
) -> Result<()> {
    if exited.contains(&node) {
        return Ok(()); // already scanned
    }

    if !remaining.remove(&node) {
        let cycle = stack
            .iter()
            .skip_while(|&&ancestor| ancestor != node)
            .chain(iter::once(&node))
            .map(|&ancestor| describe_node(ancestor))
            .join(" -> ");
        return Err(Error::CyclicSystemOrder(cycle));
    }

    stack.push(node);

    for &dependent in dependents.get(node).expect("invalid node index") {
        scan_cycles_from(dependents, dependent, remaining, exited, stack, describe_node)?;
    }

    let popped = stack.pop();
    debug_assert_eq!(Some(node), popped);

    let new_exit = exited.insert(node);
    assert!(new_exit, "exited is inserted recursively but no cycles were detected");

    Ok(())
}

/// Topological sort preferring the lowest ready index.
fn sort_stable(dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut dependency_counts = vec![0_usize; dependents.len()];
    for &dependent in dependents.iter().flatten() {
        *dependency_counts.get_mut(dependent).expect("invalid node index") += 1;
    }

    let mut ready: BTreeSet<usize> = dependency_counts
        .iter()
        .enumerate()
        .filter_map(|(node, &count)| (count == 0).then_some(node))
        .collect();

    let mut order = Vec::with_capacity(dependents.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);

        for &dependent in dependents.get(node).expect("invalid node index") {
            let count = dependency_counts.get_mut(dependent).expect("invalid node index");
            *count = count.checked_sub(1).expect("dependent should have nonzero dependency count");
            if *count == 0 {
                ready.insert(dependent);
            }
        }
    }

    assert_eq!(order.len(), dependents.len(), "cycles should have been rejected by scan_cycles");
    order
}
