use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::*;

/// How a [`Molecule`] is turned back into SMILES.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Order atoms by Morgan rank instead of by atom index.
    pub canonical: bool,
    /// Write every atom in brackets with its hydrogen count.
    pub all_hs_explicit: bool,
}

impl WriteOptions {
    /// Input order, every atom bracketed.
    pub fn protected() -> Self {
        Self {
            canonical: false,
            all_hs_explicit: true,
        }
    }
}

/// Rewrites a SMILES string so that every atom is a bracket atom carrying
/// its hydrogen count, keeping the written atom order.
pub fn protect_smiles(smiles: &str) -> Result<String> {
    let molecule = parse_smiles(smiles)?;
    Ok(molecule.to_smiles(WriteOptions::protected()))
}

/// Top-level function to convert a molecule into a SMILES string.
///
/// Each connected component is written depth first from its lowest ranked
/// atom, components joined with `.`.
pub fn molecule_to_smiles(molecule: &Molecule, options: WriteOptions) -> String {
    let graph = molecule.graph();
    let ranks = if options.canonical {
        morgan_ranks(graph)
    } else {
        (0..graph.node_count()).collect()
    };

    let mut roots: Vec<NodeIndex> = graph.node_indices().collect();
    roots.sort_by_key(|node| ranks[node.index()]);

    let mut writer = Writer::new(molecule, options, ranks);
    let mut fragments = Vec::new();
    for root in roots {
        if writer.visited[root.index()] {
            continue;
        }
        writer.compute_spanning_tree_and_ring_closures(root);
        let mut smiles = String::new();
        writer.generate_smiles_from_tree(root, &mut smiles);
        fragments.push(smiles);
    }
    fragments.join(".")
}

struct Writer<'a> {
    molecule: &'a Molecule,
    options: WriteOptions,
    ranks: Vec<usize>,
    visited: Vec<bool>,
    on_path: Vec<bool>,
    parent: Vec<Option<NodeIndex>>,
    children: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    /// Ring bonds whose digit is written first at this atom.
    openings: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    /// Ring bonds closed at this atom, with the atom that opened them.
    closings: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    ring_digits: HashMap<EdgeIndex, usize>,
    digits_in_use: BTreeSet<usize>,
}

impl<'a> Writer<'a> {
    fn new(molecule: &'a Molecule, options: WriteOptions, ranks: Vec<usize>) -> Self {
        let n = molecule.atom_count();
        Self {
            molecule,
            options,
            ranks,
            visited: vec![false; n],
            on_path: vec![false; n],
            parent: vec![None; n],
            children: vec![Vec::new(); n],
            openings: vec![Vec::new(); n],
            closings: vec![Vec::new(); n],
            ring_digits: HashMap::new(),
            digits_in_use: BTreeSet::new(),
        }
    }

    /// First pass: a depth-first spanning tree, where every bond back to an
    /// atom still on the DFS path becomes a ring closure.
    fn compute_spanning_tree_and_ring_closures(&mut self, root: NodeIndex) {
        let mut stack = vec![(root, self.enter(root), 0)];
        while let Some((current, neighbors, next)) = stack.last_mut() {
            let current = *current;
            let Some(&(other, edge)) = neighbors.get(*next) else {
                self.on_path[current.index()] = false;
                stack.pop();
                continue;
            };
            *next += 1;

            if self.parent[current.index()] == Some(other) {
                continue;
            }
            if !self.visited[other.index()] {
                self.parent[other.index()] = Some(current);
                self.children[current.index()].push((other, edge));
                let neighbors = self.enter(other);
                stack.push((other, neighbors, 0));
            } else if self.on_path[other.index()] {
                self.openings[other.index()].push((current, edge));
                self.closings[current.index()].push((other, edge));
            }
        }
    }

    /// Marks `current` as visited and returns its neighbors in rank order.
    fn enter(&mut self, current: NodeIndex) -> Vec<(NodeIndex, EdgeIndex)> {
        self.visited[current.index()] = true;
        self.on_path[current.index()] = true;

        let molecule = self.molecule;
        let graph = molecule.graph();
        let mut neighbors: Vec<(NodeIndex, EdgeIndex)> = graph
            .edges(current)
            .map(|edge| {
                let other = if edge.source() == current {
                    edge.target()
                } else {
                    edge.source()
                };
                (other, edge.id())
            })
            .collect();
        neighbors.sort_by_key(|(other, _)| self.ranks[other.index()]);
        neighbors
    }

    /// Second pass: writes the tree rooted at `root`, ring digits right
    /// after each atom and every child but the last as a branch.
    fn generate_smiles_from_tree(&mut self, root: NodeIndex, out: &mut String) {
        let molecule = self.molecule;
        let graph = molecule.graph();
        let mut steps = vec![Step::Atom(root)];
        while let Some(step) = steps.pop() {
            let current = match step {
                Step::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Step::Atom(current) => current,
            };
            self.write_atom(current, out);

            // Pushed in reverse so the first child is written first
            let children = &self.children[current.index()];
            let last = children.len().saturating_sub(1);
            for (i, &(child, edge)) in children.iter().enumerate().rev() {
                if i < last {
                    steps.push(Step::Text(")"));
                }
                steps.push(Step::Atom(child));
                steps.push(Step::Text(bond_str(graph, edge, current, child)));
                if i < last {
                    steps.push(Step::Text("("));
                }
            }
        }
    }

    /// Writes one atom with its ring bonds, allocating digits for the rings
    /// it opens.
    fn write_atom(&mut self, current: NodeIndex, out: &mut String) {
        let molecule = self.molecule;
        let graph = molecule.graph();
        let stored_order = molecule.neighbor_order(current);

        let mut written_order = Vec::new();
        if let Some(parent) = self.parent[current.index()] {
            written_order.push(Neighbor::Atom(parent));
        }
        if stored_order.is_some_and(|order| order.contains(&Neighbor::Hydrogen)) {
            written_order.push(Neighbor::Hydrogen);
        }

        let mut rings = String::new();
        let mut released = Vec::new();
        for &(partner, edge) in &self.closings[current.index()] {
            // Opened by an ancestor, which was written first
            if let Some(digit) = self.ring_digits.remove(&edge) {
                rings.push_str(bond_str(graph, edge, current, partner));
                rings.push_str(&format_ring(digit));
                released.push(digit);
                written_order.push(Neighbor::Atom(partner));
            }
        }
        for &(partner, edge) in &self.openings[current.index()] {
            let digit = lowest_free_digit(&self.digits_in_use);
            self.digits_in_use.insert(digit);
            self.ring_digits.insert(edge, digit);
            rings.push_str(&format_ring(digit));
            written_order.push(Neighbor::Atom(partner));
        }
        for digit in released {
            self.digits_in_use.remove(&digit);
        }

        written_order.extend(
            self.children[current.index()]
                .iter()
                .map(|&(child, _)| Neighbor::Atom(child)),
        );

        let chirality = graph[current].chirality.as_ref().map(|chirality| match stored_order {
            Some(stored) if is_odd_permutation(stored, &written_order) => chirality.inverted(),
            _ => chirality.clone(),
        });
        out.push_str(&atom_str(molecule, current, chirality.as_ref(), self.options));
        out.push_str(&rings);
    }
}

/// Pending output of the second pass.
enum Step {
    Atom(NodeIndex),
    Text(&'static str),
}

fn lowest_free_digit(in_use: &BTreeSet<usize>) -> usize {
    let mut digit = 1;
    while in_use.contains(&digit) {
        digit += 1;
    }
    digit
}

/// Whether `written` is an odd permutation of `stored`.
fn is_odd_permutation(stored: &[Neighbor], written: &[Neighbor]) -> bool {
    let positions: Vec<usize> = written
        .iter()
        .filter_map(|neighbor| stored.iter().position(|other| other == neighbor))
        .collect();
    let mut inversions = 0;
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            if positions[i] > positions[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 1
}

/// Returns the bond symbol for `edge` written from `from` towards `to`.
fn bond_str(graph: &MoleculeGraph, edge: EdgeIndex, from: NodeIndex, to: NodeIndex) -> &'static str {
    let aromatic_pair = graph[from].aromatic && graph[to].aromatic;
    let forward = graph
        .edge_endpoints(edge)
        .map_or(true, |(source, _)| source == from);
    let bond = if forward {
        graph[edge]
    } else {
        graph[edge].reversed()
    };
    match bond {
        Bond::Single if aromatic_pair => "-",
        Bond::Single => "",
        Bond::Double => "=",
        Bond::Triple => "#",
        Bond::Quadruple => "$",
        Bond::Aromatic if aromatic_pair => "",
        Bond::Aromatic => ":",
        Bond::Up => "/",
        Bond::Down => "\\",
    }
}

/// Formats a ring closure digit according to SMILES rules.
fn format_ring(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{}", digit)
    }
}

fn atom_str(
    molecule: &Molecule,
    node: NodeIndex,
    chirality: Option<&Chirality>,
    options: WriteOptions,
) -> String {
    let atom = &molecule.graph()[node];
    if !options.all_hs_explicit && !atom.is_bracketed() {
        return atom.symbol();
    }

    let mut s = String::from("[");
    if let Some(isotope) = atom.isotope {
        s.push_str(&isotope.to_string());
    }
    s.push_str(&atom.symbol());
    if let Some(chirality) = chirality {
        s.push_str(chirality.as_str());
    }
    match molecule.total_hydrogens(node) {
        0 => {}
        1 => s.push('H'),
        n => s.push_str(&format!("H{n}")),
    }
    match atom.charge {
        0 => {}
        1 => s.push('+'),
        -1 => s.push('-'),
        charge if charge > 0 => s.push_str(&format!("+{charge}")),
        charge => s.push_str(&format!("{charge}")),
    }
    if let Some(class) = atom.class {
        s.push_str(&format!(":{class}"));
    }
    s.push(']');
    s
}
