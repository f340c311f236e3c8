use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;

use crate::*;

/// One entry in the neighbour ordering a tetrahedral chirality tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Neighbor {
    Atom(NodeIndex),
    /// The hydrogen written inside the centre's own brackets, as in `[C@H]`.
    Hydrogen,
}

/// A parsed molecule: the atom/bond graph plus, for every tetrahedral
/// centre, the neighbour order its `@`/`@@` tag was written against.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: MoleculeGraph,
    stereo: BTreeMap<NodeIndex, Vec<Neighbor>>,
}

impl Molecule {
    pub fn new(graph: MoleculeGraph, stereo: BTreeMap<NodeIndex, Vec<Neighbor>>) -> Self {
        Self { graph, stereo }
    }

    pub fn graph(&self) -> &MoleculeGraph {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    /// The reference neighbour order of a tetrahedral centre.
    pub fn neighbor_order(&self, atom: NodeIndex) -> Option<&[Neighbor]> {
        self.stereo.get(&atom).map(Vec::as_slice)
    }

    pub(crate) fn stereo(&self) -> &BTreeMap<NodeIndex, Vec<Neighbor>> {
        &self.stereo
    }

    /// Number of disconnected components (`.`-separated fragments).
    pub fn fragment_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    /// Hydrogens implied by the normal valence of a bare atom. Bracket atoms
    /// never carry implicit hydrogens.
    pub fn implicit_hydrogens(&self, atom: NodeIndex) -> u8 {
        let node = &self.graph[atom];
        if node.is_bracketed() {
            return 0;
        }
        let bonded: u32 = self
            .graph
            .edges(atom)
            .map(|edge| u32::from(edge.weight().order()))
            .sum();
        // Aromatic atoms give one electron to the ring system.
        let aromatic = u32::from(node.aromatic);
        node.element
            .default_valences()
            .iter()
            .map(|&valence| u32::from(valence))
            .find(|&valence| valence >= bonded)
            .map(|valence| (valence - bonded).saturating_sub(aromatic) as u8)
            .unwrap_or(0)
    }

    /// Bracket hydrogens for bracket atoms, implicit ones otherwise.
    pub fn total_hydrogens(&self, atom: NodeIndex) -> u8 {
        match self.graph[atom].hydrogens {
            Some(count) => count,
            None => self.implicit_hydrogens(atom),
        }
    }

    /// Renumbers atoms so that new atom `i` is old atom `new_order[i]`.
    pub fn renumber(&self, new_order: &[usize]) -> Result<Molecule, RenumberError> {
        renumber_atoms(self, new_order)
    }

    pub fn to_smiles(&self, options: WriteOptions) -> String {
        molecule_to_smiles(self, options)
    }
}
