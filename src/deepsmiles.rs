//! SMILES to DeepSMILES conversion.
//!
//! DeepSMILES replaces paired ring closure digits with a single ring size
//! written at the closing atom, and replaces `(`...`)` branches with a run
//! of `)` that says how many atoms to pop off the current chain.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeepSmilesError {
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingNumber(usize),
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Branch opened at position {0} is never closed")]
    UnclosedBranch(usize),
    #[error("Ring closure at position {0} without a current atom")]
    RingClosureNoCurrentAtom(usize),
    #[error("Ring closure '{0}' closes on an atom that is no longer on the chain")]
    RingOpeningNotOnChain(u16),
    #[error("Ring closure '{0}' is never closed")]
    UnclosedRing(u16),
    #[error("Bond symbol at position {0} is not followed by an atom or ring closure")]
    DanglingBond(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Atom(&'a str),
    Bond(char),
    /// Ring closure number and the text it was written as.
    Ring(u16, &'a str),
    BranchStart,
    BranchEnd,
    Dot,
}

fn lex(smiles: &str) -> Result<Vec<(Token<'_>, usize)>, DeepSmilesError> {
    let bytes = smiles.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < smiles.len() {
        let c = bytes[i] as char;
        let (token, width) = match c {
            '[' => {
                let end = smiles[i..]
                    .find(']')
                    .ok_or(DeepSmilesError::UnclosedBracket(i))?;
                (Token::Atom(&smiles[i..=i + end]), end + 1)
            }
            'B' if smiles[i..].starts_with("Br") => (Token::Atom(&smiles[i..i + 2]), 2),
            'C' if smiles[i..].starts_with("Cl") => (Token::Atom(&smiles[i..i + 2]), 2),
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' | '*' | 'b' | 'c' | 'n' | 'o' | 'p'
            | 's' => (Token::Atom(&smiles[i..i + 1]), 1),
            '-' | '=' | '#' | '$' | ':' | '/' | '\\' => (Token::Bond(c), 1),
            '0'..='9' => (Token::Ring(u16::from(bytes[i] - b'0'), &smiles[i..i + 1]), 1),
            '%' => {
                let digits = smiles
                    .get(i + 1..i + 3)
                    .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
                    .ok_or(DeepSmilesError::IncompleteRingNumber(i))?;
                let number = digits
                    .parse()
                    .map_err(|_| DeepSmilesError::IncompleteRingNumber(i))?;
                (Token::Ring(number, &smiles[i..i + 3]), 3)
            }
            '(' => (Token::BranchStart, 1),
            ')' => (Token::BranchEnd, 1),
            '.' => (Token::Dot, 1),
            _ => {
                let c = smiles[i..].chars().next().unwrap_or(c);
                return Err(DeepSmilesError::UnexpectedCharacter(c, i));
            }
        };
        tokens.push((token, i));
        i += width;
    }
    Ok(tokens)
}

/// A ring bond waiting for its closing digit.
#[derive(Debug, Clone, Copy)]
struct OpenRing {
    atom: usize,
    bond: Option<char>,
}

/// Converts SMILES to DeepSMILES, with ring and branch rewriting each
/// switchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converter {
    pub rings: bool,
    pub branches: bool,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            rings: true,
            branches: true,
        }
    }
}

impl Converter {
    pub fn new(rings: bool, branches: bool) -> Self {
        Self { rings, branches }
    }

    /// Encodes a SMILES string.
    ///
    /// Ring openings must lie on the path from the fragment's first atom to
    /// the closing atom, which holds for any SMILES written by a depth-first
    /// traversal.
    pub fn encode(&self, smiles: &str) -> Result<String, DeepSmilesError> {
        let tokens = lex(smiles)?;
        let mut out = String::with_capacity(smiles.len());

        let mut atoms = 0;
        // Atoms from the fragment root to the current atom
        let mut chain: Vec<usize> = Vec::new();
        let mut branch_stack: Vec<(usize, usize)> = Vec::new();
        let mut rings: BTreeMap<u16, OpenRing> = BTreeMap::new();
        let mut pending_bond: Option<(char, usize)> = None;

        for (token, position) in tokens {
            match token {
                Token::Atom(text) => {
                    if let Some((bond, _)) = pending_bond.take() {
                        out.push(bond);
                    }
                    out.push_str(text);
                    chain.push(atoms);
                    atoms += 1;
                }
                Token::Bond(bond) => {
                    if pending_bond.is_some() {
                        return Err(DeepSmilesError::UnexpectedCharacter(bond, position));
                    }
                    pending_bond = Some((bond, position));
                }
                Token::Ring(number, text) => {
                    let &current = chain
                        .last()
                        .ok_or(DeepSmilesError::RingClosureNoCurrentAtom(position))?;
                    let bond = pending_bond.take().map(|(bond, _)| bond);
                    if !self.rings {
                        out.extend(bond);
                        out.push_str(text);
                        continue;
                    }
                    match rings.remove(&number) {
                        None => {
                            rings.insert(number, OpenRing { atom: current, bond });
                        }
                        Some(opening) => {
                            let start = chain
                                .iter()
                                .position(|&atom| atom == opening.atom)
                                .ok_or(DeepSmilesError::RingOpeningNotOnChain(number))?;
                            let bond = bond.or(opening.bond.map(flip_direction));
                            out.extend(bond);
                            out.push_str(&format_ring_size(chain.len() - start));
                        }
                    }
                }
                Token::BranchStart => {
                    no_pending_bond(pending_bond)?;
                    if chain.is_empty() {
                        return Err(DeepSmilesError::BranchNoCurrentAtom(position));
                    }
                    branch_stack.push((chain.len(), position));
                    if !self.branches {
                        out.push('(');
                    }
                }
                Token::BranchEnd => {
                    no_pending_bond(pending_bond)?;
                    let (length, _) = branch_stack
                        .pop()
                        .ok_or(DeepSmilesError::BranchEndNoStart(position))?;
                    let popped = chain.len().saturating_sub(length);
                    chain.truncate(length);
                    if self.branches {
                        out.extend(std::iter::repeat(')').take(popped));
                    } else {
                        out.push(')');
                    }
                }
                Token::Dot => {
                    no_pending_bond(pending_bond)?;
                    chain.clear();
                    out.push('.');
                }
            }
        }

        no_pending_bond(pending_bond)?;
        if let Some(&(_, position)) = branch_stack.first() {
            return Err(DeepSmilesError::UnclosedBranch(position));
        }
        if let Some(&number) = rings.keys().next() {
            return Err(DeepSmilesError::UnclosedRing(number));
        }
        trace!("DeepSMILES {smiles} -> {out}");
        Ok(out)
    }
}

fn no_pending_bond(pending_bond: Option<(char, usize)>) -> Result<(), DeepSmilesError> {
    match pending_bond {
        Some((_, position)) => Err(DeepSmilesError::DanglingBond(position)),
        None => Ok(()),
    }
}

/// A directional bond moved from the opening atom to the closing atom is
/// read in the opposite direction.
fn flip_direction(bond: char) -> char {
    match bond {
        '/' => '\\',
        '\\' => '/',
        other => other,
    }
}

fn format_ring_size(size: usize) -> String {
    match size {
        0..=9 => size.to_string(),
        10..=99 => format!("%{size}"),
        _ => format!("%({size})"),
    }
}

/// Encodes SMILES as DeepSMILES with both ring and branch rewriting.
pub fn smiles_to_deepsmiles(smiles: &str) -> Result<String, DeepSmilesError> {
    Converter::default().encode(smiles)
}
