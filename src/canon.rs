use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenumberError {
    #[error("Atom order has {got} entries but the molecule has {expected} atoms")]
    WrongLength { expected: usize, got: usize },
    #[error("Atom index {0} is out of range")]
    OutOfRange(usize),
    #[error("Atom index {0} appears more than once")]
    Duplicate(usize),
}

/// Computes a hash value for any hashable object.
fn compute_hash<T: Hash>(t: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    t.hash(&mut hasher);
    hasher.finish()
}

/// Atom invariants every label starts from.
fn initial_label(graph: &MoleculeGraph, node: NodeIndex) -> u64 {
    let atom = &graph[node];
    compute_hash(&(
        atom.element.atomic_number(),
        atom.aromatic,
        atom.isotope,
        atom.charge,
        atom.hydrogens,
        graph.edges(node).count(),
    ))
}

/// Implements the Morgan algorithm for a given molecule graph.
///
/// # Arguments
/// * `graph` - A reference to the molecule graph.
/// * `max_iterations` - Maximum number of refinement rounds.
///
/// # Returns
/// One label per atom, indexed by node index. Atoms with equal labels are
/// indistinguishable by their extended connectivity.
pub fn morgan_algorithm(graph: &MoleculeGraph, max_iterations: usize) -> Vec<u64> {
    let mut labels: Vec<u64> = graph
        .node_indices()
        .map(|node| initial_label(graph, node))
        .collect();
    let mut classes = count_classes(&labels);

    for _ in 0..max_iterations {
        let updated: Vec<u64> = graph
            .node_indices()
            .map(|node| {
                let mut neighbor_labels: Vec<(u64, u8)> = graph
                    .edges(node)
                    .map(|edge| {
                        let other = if edge.source() == node {
                            edge.target()
                        } else {
                            edge.source()
                        };
                        (labels[other.index()], edge.weight().order())
                    })
                    .collect();
                neighbor_labels.sort_unstable();
                compute_hash(&(labels[node.index()], neighbor_labels))
            })
            .collect();

        // Stop once a round no longer splits any class
        let updated_classes = count_classes(&updated);
        if updated_classes <= classes {
            break;
        }
        labels = updated;
        classes = updated_classes;
    }

    labels
}

fn count_classes(labels: &[u64]) -> usize {
    labels.iter().collect::<HashSet<_>>().len()
}

/// Orders atoms by Morgan label, ties broken by input position.
///
/// Returns the rank of every atom, indexed by node index.
pub fn morgan_ranks(graph: &MoleculeGraph) -> Vec<usize> {
    let labels = morgan_algorithm(graph, 100);
    let mut nodes_with_labels: Vec<(usize, u64)> = labels.into_iter().enumerate().collect();
    nodes_with_labels.sort_by_key(|&(node, label)| (label, node));

    let mut ranks = vec![0; nodes_with_labels.len()];
    for (rank, (node, _)) in nodes_with_labels.into_iter().enumerate() {
        ranks[node] = rank;
    }
    ranks
}

/// Rebuilds a molecule with its atoms renumbered.
///
/// # Arguments
/// * `molecule` - The molecule to renumber.
/// * `new_order` - A permutation of the atom indices; new atom `i` is old
///   atom `new_order[i]`.
///
/// # Returns
/// The same molecule with bonds, bond directions and stereo neighbour
/// orders carried over to the new indices.
pub fn renumber_atoms(molecule: &Molecule, new_order: &[usize]) -> Result<Molecule, RenumberError> {
    let graph = molecule.graph();
    let atom_count = graph.node_count();
    if new_order.len() != atom_count {
        return Err(RenumberError::WrongLength {
            expected: atom_count,
            got: new_order.len(),
        });
    }

    // Build a mapping from the old node index to a new node index.
    let mut mapping: Vec<Option<NodeIndex>> = vec![None; atom_count];
    let mut new_graph = MoleculeGraph::default();
    for &old in new_order {
        let slot = mapping.get_mut(old).ok_or(RenumberError::OutOfRange(old))?;
        if slot.is_some() {
            return Err(RenumberError::Duplicate(old));
        }
        *slot = Some(new_graph.add_node(graph[NodeIndex::new(old)].clone()));
    }
    // Every old index is mapped once the permutation check above has passed.
    let mapping: Vec<NodeIndex> = mapping.into_iter().flatten().collect();

    // Rebuild the edges using the new node indices, keeping their orientation.
    for edge in graph.edge_references() {
        new_graph.add_edge(
            mapping[edge.source().index()],
            mapping[edge.target().index()],
            *edge.weight(),
        );
    }

    let stereo: BTreeMap<NodeIndex, Vec<Neighbor>> = molecule
        .stereo()
        .iter()
        .map(|(center, order)| {
            let order = order
                .iter()
                .map(|neighbor| match neighbor {
                    Neighbor::Atom(atom) => Neighbor::Atom(mapping[atom.index()]),
                    Neighbor::Hydrogen => Neighbor::Hydrogen,
                })
                .collect();
            (mapping[center.index()], order)
        })
        .collect();

    Ok(Molecule::new(new_graph, stereo))
}
