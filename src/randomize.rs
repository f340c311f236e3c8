use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::*;

/// A uniformly random permutation of `0..atom_count`.
pub fn random_atom_order<R: Rng + ?Sized>(atom_count: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..atom_count).collect();
    order.shuffle(rng);
    order
}

/// Writes `count` SMILES strings for `molecule`, each from an independent
/// random atom order.
///
/// Variants are neither cached nor deduplicated, so the same string can
/// come up more than once.
pub fn randomize<R: Rng + ?Sized>(
    molecule: &Molecule,
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>> {
    let options = WriteOptions {
        canonical: false,
        all_hs_explicit: false,
    };
    (0..count)
        .map(|_| {
            let order = random_atom_order(molecule.atom_count(), rng);
            let renumbered = molecule
                .renumber(&order)
                .context(format!("Failed to renumber atoms with order {order:?}"))?;
            let smiles = renumbered.to_smiles(options);
            trace!("Randomized SMILES: {smiles}");
            Ok(smiles)
        })
        .collect()
}

/// Parses `smiles` and returns `count` randomized variants of it.
pub fn randomize_smiles<R: Rng + ?Sized>(
    smiles: &str,
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>> {
    let molecule = parse_smiles(smiles)?;
    randomize(&molecule, count, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn elements(smiles: &str) -> Vec<Element> {
        let molecule = parse_smiles(smiles).unwrap();
        let mut elements: Vec<Element> = molecule
            .graph()
            .node_weights()
            .map(|atom| atom.element)
            .collect();
        elements.sort_by_key(|element| element.atomic_number());
        elements
    }

    #[test]
    fn test_random_atom_order_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = random_atom_order(20, &mut rng);
        order.sort_unstable();
        assert_eq!(order, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_randomize_is_deterministic_for_a_seed() {
        let molecule = parse_smiles("CC(=O)Nc1ccc(O)cc1").unwrap();
        let first = randomize(&molecule, 5, &mut StdRng::seed_from_u64(12345)).unwrap();
        let second = randomize(&molecule, 5, &mut StdRng::seed_from_u64(12345)).unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_randomize_keeps_the_molecule() {
        let smiles = "CC(=O)Nc1ccc(O)cc1";
        let mut rng = StdRng::seed_from_u64(1);
        for variant in randomize_smiles(smiles, 10, &mut rng).unwrap() {
            let molecule = parse_smiles(&variant).unwrap();
            assert_eq!(molecule.atom_count(), 11);
            assert_eq!(molecule.bond_count(), 11);
            assert_eq!(elements(&variant), elements(smiles));
        }
    }

    #[test]
    fn test_randomize_zero_count() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(randomize_smiles("CCO", 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_randomize_single_atom() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            randomize_smiles("[NH4+]", 3, &mut rng).unwrap(),
            vec!["[NH4+]"; 3]
        );
    }
}
