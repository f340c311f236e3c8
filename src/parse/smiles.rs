use std::collections::BTreeMap;

use anyhow::{Context, Result};
use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::trace;

use crate::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Branch opened at position {0} is never closed")]
    UnclosedBranch(usize),
    #[error("Ring closure '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(u16, usize),
    #[error("Ring closure '{0}' is never closed")]
    UnclosedRing(u16),
    #[error("Ring closure '{0}' has conflicting bond symbols")]
    ConflictingRingBond(u16),
    #[error("Ring closure '{0}' bonds an atom to itself")]
    RingBondToSelf(u16),
    #[error("Ring closure '{0}' duplicates an existing bond")]
    DuplicateBond(u16),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingNumber(usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid bracket atom '[{0}]'")]
    InvalidBracketAtom(String),
    #[error("Bond symbol at position {0} is not followed by an atom or ring closure")]
    DanglingBond(usize),
}

/// Parses a SMILES string into a [`Molecule`].
///
/// # Arguments
///
/// * `smiles` - The SMILES string to parse.
///
/// # Returns
///
/// * `Result<Molecule>` - The parsed molecule, or the first syntax error
///   with the offending input attached as context.
pub fn parse_smiles(smiles: &str) -> Result<Molecule> {
    let molecule = Parser::default()
        .parse(smiles)
        .context(format!("Failed to parse SMILES string {smiles}"))?;
    trace!(
        "Parsed {smiles} into {} atoms and {} bonds",
        molecule.atom_count(),
        molecule.bond_count()
    );
    Ok(molecule)
}

/// A ring bond whose opening digit has been read but not its closing one.
#[derive(Debug, Clone, Copy)]
struct RingOpening {
    atom: NodeIndex,
    /// Position reserved in the opening atom's neighbour order.
    slot: usize,
    bond: Option<Bond>,
}

#[derive(Default)]
struct Parser {
    graph: MoleculeGraph,
    /// Neighbour order of every atom in the order the neighbours were
    /// written; `None` marks a ring bond that has not been closed yet.
    orders: Vec<Vec<Option<Neighbor>>>,
    current_atom: Option<NodeIndex>,
    pending_bond: Option<(Bond, usize)>,
    branch_stack: Vec<(NodeIndex, usize)>,
    ring_map: BTreeMap<u16, RingOpening>,
}

impl Parser {
    fn parse(mut self, smiles: &str) -> Result<Molecule, SmilesError> {
        let chars: Vec<char> = smiles.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '(' => {
                    // Start of a branch: remember where to come back to
                    let atom = self.current_atom.ok_or(SmilesError::BranchNoCurrentAtom(i))?;
                    self.no_pending_bond()?;
                    self.branch_stack.push((atom, i));
                    i += 1;
                }
                ')' => {
                    self.no_pending_bond()?;
                    let (atom, _) = self
                        .branch_stack
                        .pop()
                        .ok_or(SmilesError::BranchEndNoStart(i))?;
                    self.current_atom = Some(atom);
                    i += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.pending_bond.is_some() {
                        return Err(SmilesError::UnexpectedCharacter(c, i));
                    }
                    let bond = Bond::from_symbol(c).ok_or(SmilesError::UnexpectedCharacter(c, i))?;
                    self.pending_bond = Some((bond, i));
                    i += 1;
                }
                '%' => {
                    // Two-digit ring closure label
                    let digits: String = chars.iter().skip(i + 1).take(2).collect();
                    if digits.len() != 2 || !digits.chars().all(|d| d.is_ascii_digit()) {
                        return Err(SmilesError::IncompleteRingNumber(i));
                    }
                    let ring_number = digits
                        .parse()
                        .map_err(|_| SmilesError::IncompleteRingNumber(i))?;
                    self.ring_closure(ring_number, i)?;
                    i += 3;
                }
                '0'..='9' => {
                    let ring_number = c.to_digit(10).unwrap_or_default() as u16;
                    self.ring_closure(ring_number, i)?;
                    i += 1;
                }
                '[' => {
                    let end_relative = chars[i..]
                        .iter()
                        .position(|&x| x == ']')
                        .ok_or(SmilesError::UnclosedBracket(i))?;
                    let end = i + end_relative;
                    let content: String = chars[i + 1..end].iter().collect();
                    let atom = parse_bracket_atom(&content)?;
                    self.add_atom(atom, i)?;
                    i = end + 1;
                }
                '.' => {
                    // Next atom starts a disconnected fragment
                    self.no_pending_bond()?;
                    self.current_atom = None;
                    i += 1;
                }
                _ => {
                    let (element, aromatic, width) = organic_atom(&chars[i..])
                        .ok_or(SmilesError::UnexpectedCharacter(c, i))?;
                    self.add_atom(Atom::organic(element, aromatic), i)?;
                    i += width;
                }
            }
        }

        self.no_pending_bond()?;
        if let Some(&(_, position)) = self.branch_stack.first() {
            return Err(SmilesError::UnclosedBranch(position));
        }
        if let Some(&ring_number) = self.ring_map.keys().next() {
            return Err(SmilesError::UnclosedRing(ring_number));
        }

        let stereo: BTreeMap<NodeIndex, Vec<Neighbor>> = self
            .graph
            .node_indices()
            .filter(|&atom| {
                self.graph[atom]
                    .chirality
                    .as_ref()
                    .is_some_and(Chirality::is_tetrahedral)
            })
            .map(|atom| {
                let order: Vec<Neighbor> =
                    self.orders[atom.index()].iter().flatten().copied().collect();
                (atom, order)
            })
            .collect();
        Ok(Molecule::new(self.graph, stereo))
    }

    fn no_pending_bond(&self) -> Result<(), SmilesError> {
        match self.pending_bond {
            Some((_, position)) => Err(SmilesError::DanglingBond(position)),
            None => Ok(()),
        }
    }

    fn default_bond(&self, a: NodeIndex, b: NodeIndex) -> Bond {
        if self.graph[a].aromatic && self.graph[b].aromatic {
            Bond::Aromatic
        } else {
            Bond::Single
        }
    }

    fn add_atom(&mut self, atom: Atom, position: usize) -> Result<(), SmilesError> {
        let stereo_hydrogen = atom.has_stereo_hydrogen();
        let new_atom = self.graph.add_node(atom);
        self.orders.push(Vec::new());

        match (self.current_atom, self.pending_bond.take()) {
            (Some(prev_atom), pending) => {
                let bond = match pending {
                    Some((bond, _)) => bond,
                    None => self.default_bond(prev_atom, new_atom),
                };
                self.graph.add_edge(prev_atom, new_atom, bond);
                self.orders[prev_atom.index()].push(Some(Neighbor::Atom(new_atom)));
                self.orders[new_atom.index()].push(Some(Neighbor::Atom(prev_atom)));
            }
            (None, Some((_, bond_position))) => {
                return Err(SmilesError::DanglingBond(bond_position));
            }
            (None, None) => {}
        }

        // A bracket hydrogen follows the preceding atom, or leads when there is none.
        if stereo_hydrogen {
            self.orders[new_atom.index()].push(Some(Neighbor::Hydrogen));
        }
        trace!("Atom {} at position {position}", new_atom.index());
        self.current_atom = Some(new_atom);
        Ok(())
    }

    fn ring_closure(&mut self, ring_number: u16, position: usize) -> Result<(), SmilesError> {
        let current = self
            .current_atom
            .ok_or(SmilesError::RingClosureNoCurrentAtom(ring_number, position))?;
        let bond = self.pending_bond.take().map(|(bond, _)| bond);

        let Some(opening) = self.ring_map.remove(&ring_number) else {
            let slot = self.orders[current.index()].len();
            self.orders[current.index()].push(None);
            self.ring_map.insert(ring_number, RingOpening { atom: current, slot, bond });
            return Ok(());
        };

        if opening.atom == current {
            return Err(SmilesError::RingBondToSelf(ring_number));
        }
        if self.graph.find_edge(opening.atom, current).is_some() {
            return Err(SmilesError::DuplicateBond(ring_number));
        }

        // A symbol on either side is read from its own atom towards the partner.
        let (source, target, bond) = match (opening.bond, bond) {
            (Some(open), Some(close)) => {
                let consistent = if open.is_directional() {
                    close == open.reversed()
                } else {
                    close == open
                };
                if !consistent {
                    return Err(SmilesError::ConflictingRingBond(ring_number));
                }
                (current, opening.atom, close)
            }
            (None, Some(close)) => (current, opening.atom, close),
            (Some(open), None) => (opening.atom, current, open),
            (None, None) => (opening.atom, current, self.default_bond(opening.atom, current)),
        };
        self.graph.add_edge(source, target, bond);
        self.orders[opening.atom.index()][opening.slot] = Some(Neighbor::Atom(current));
        self.orders[current.index()].push(Some(Neighbor::Atom(opening.atom)));
        Ok(())
    }
}

/// Reads an atom from the organic subset, returning the element, its
/// aromaticity and how many characters it spans.
fn organic_atom(chars: &[char]) -> Option<(Element, bool, usize)> {
    match chars {
        ['B', 'r', ..] => Some((Element::BR, false, 2)),
        ['C', 'l', ..] => Some((Element::CL, false, 2)),
        ['B', ..] => Some((Element::B, false, 1)),
        ['C', ..] => Some((Element::C, false, 1)),
        ['N', ..] => Some((Element::N, false, 1)),
        ['O', ..] => Some((Element::O, false, 1)),
        ['P', ..] => Some((Element::P, false, 1)),
        ['S', ..] => Some((Element::S, false, 1)),
        ['F', ..] => Some((Element::F, false, 1)),
        ['I', ..] => Some((Element::I, false, 1)),
        ['*', ..] => Some((Element::WILDCARD, false, 1)),
        ['b', ..] => Some((Element::B, true, 1)),
        ['c', ..] => Some((Element::C, true, 1)),
        ['n', ..] => Some((Element::N, true, 1)),
        ['o', ..] => Some((Element::O, true, 1)),
        ['p', ..] => Some((Element::P, true, 1)),
        ['s', ..] => Some((Element::S, true, 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::visit::EdgeRef;

    fn parse_error(smiles: &str) -> SmilesError {
        let error = parse_smiles(smiles).expect_err("SMILES should be rejected");
        error
            .downcast_ref::<SmilesError>()
            .cloned()
            .expect("error is not a SmilesError")
    }

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 3);
        assert_eq!(molecule.atom(0).unwrap().element, Element::C);
        assert_eq!(molecule.atom(1).unwrap().element, Element::C);
        assert_eq!(molecule.atom(2).unwrap().element, Element::O);

        let edges: Vec<_> = molecule.graph().edge_references().collect();
        assert_eq!(edges.len(), 2);
        for edge in edges {
            assert_eq!(edge.weight(), &Bond::Single);
        }
    }

    #[test]
    fn test_parse_isobutane() {
        let molecule = parse_smiles("CC(C)C").expect("Failed to parse SMILES");
        let graph = molecule.graph();
        assert_eq!(molecule.atom_count(), 4);
        assert_eq!(molecule.bond_count(), 3);
        let center = NodeIndex::new(1);
        assert_eq!(graph.neighbors(center).count(), 3);
    }

    #[test]
    fn test_parse_cyclohexane() {
        let molecule = parse_smiles("C1CCCCC1").expect("Failed to parse SMILES");
        let graph = molecule.graph();
        assert_eq!(molecule.bond_count(), 6);
        for node in graph.node_indices() {
            let degree = graph.edges(node).count();
            assert_eq!(degree, 2, "Node {} has degree {}", node.index(), degree);
        }
    }

    #[test]
    fn test_parse_benzene_bonds_are_aromatic() {
        let molecule = parse_smiles("c1ccccc1").expect("Failed to parse SMILES");
        for edge in molecule.graph().edge_references() {
            assert_eq!(edge.weight(), &Bond::Aromatic);
        }
        // Biphenyl link is an explicit single bond between aromatic atoms
        let biphenyl = parse_smiles("c1ccccc1-c1ccccc1").unwrap();
        let link = biphenyl
            .graph()
            .find_edge(NodeIndex::new(5), NodeIndex::new(6))
            .unwrap();
        assert_eq!(biphenyl.graph()[link], Bond::Single);
    }

    #[test]
    fn test_parse_ring_bond_symbols() {
        let molecule = parse_smiles("C=1CCCCC1").unwrap();
        let edge = molecule
            .graph()
            .find_edge(NodeIndex::new(0), NodeIndex::new(5))
            .unwrap();
        assert_eq!(molecule.graph()[edge], Bond::Double);

        let molecule = parse_smiles("C1CCCCC=1").unwrap();
        let edge = molecule
            .graph()
            .find_edge(NodeIndex::new(0), NodeIndex::new(5))
            .unwrap();
        assert_eq!(molecule.graph()[edge], Bond::Double);
    }

    #[test]
    fn test_parse_two_digit_ring() {
        let molecule = parse_smiles("C%12CCCCC%12").unwrap();
        assert_eq!(molecule.bond_count(), 6);
    }

    #[test]
    fn test_parse_directional_bonds_keep_reading_order() {
        let molecule = parse_smiles("F/C=C/F").unwrap();
        let graph = molecule.graph();
        let first = graph.find_edge(NodeIndex::new(0), NodeIndex::new(1)).unwrap();
        assert_eq!(graph[first], Bond::Up);
        assert_eq!(graph.edge_endpoints(first), Some((NodeIndex::new(0), NodeIndex::new(1))));
    }

    #[test]
    fn test_parse_stereo_neighbor_order() {
        // N, implicit H, C(=O), C in that order
        let molecule = parse_smiles("N[C@@H](C)C(=O)O").unwrap();
        let center = NodeIndex::new(1);
        assert_eq!(
            molecule.neighbor_order(center).unwrap(),
            &[
                Neighbor::Atom(NodeIndex::new(0)),
                Neighbor::Hydrogen,
                Neighbor::Atom(NodeIndex::new(2)),
                Neighbor::Atom(NodeIndex::new(3)),
            ]
        );

        // Ring bonds take the position of their digit
        let molecule = parse_smiles("[C@]1(F)(Cl)CC1").unwrap();
        assert_eq!(
            molecule.neighbor_order(NodeIndex::new(0)).unwrap(),
            &[
                Neighbor::Atom(NodeIndex::new(4)),
                Neighbor::Atom(NodeIndex::new(1)),
                Neighbor::Atom(NodeIndex::new(2)),
                Neighbor::Atom(NodeIndex::new(3)),
            ]
        );
    }

    #[test]
    fn test_parse_fragments() {
        let molecule = parse_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(molecule.atom_count(), 2);
        assert_eq!(molecule.bond_count(), 0);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_smiles("").unwrap().atom_count(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_error("C(C"), SmilesError::UnclosedBranch(1));
        assert_eq!(parse_error("CC)"), SmilesError::BranchEndNoStart(2));
        assert_eq!(parse_error("(C)"), SmilesError::BranchNoCurrentAtom(0));
        assert_eq!(parse_error("C1CC"), SmilesError::UnclosedRing(1));
        assert_eq!(parse_error("C11"), SmilesError::RingBondToSelf(1));
        assert_eq!(parse_error("C12CC12"), SmilesError::DuplicateBond(2));
        assert_eq!(parse_error("C=1CC#1"), SmilesError::ConflictingRingBond(1));
        assert_eq!(parse_error("C%1"), SmilesError::IncompleteRingNumber(1));
        assert_eq!(parse_error("C[CH3"), SmilesError::UnclosedBracket(1));
        assert_eq!(parse_error("C[Xy]"), SmilesError::InvalidBracketAtom("Xy".to_string()));
        assert_eq!(parse_error("CC="), SmilesError::DanglingBond(2));
        assert_eq!(parse_error("CQ"), SmilesError::UnexpectedCharacter('Q', 1));
    }
}
