use std::fmt::{Display, Formatter, Result as FmtResult};

/// Element symbols indexed by atomic number; index 0 is the `*` wildcard.
const SYMBOLS: [&str; 119] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// A chemical element, stored as its atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Element(u8);

impl Element {
    pub const WILDCARD: Element = Element(0);
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const AS: Element = Element(33);
    pub const SE: Element = Element(34);
    pub const BR: Element = Element(35);
    pub const TE: Element = Element(52);
    pub const I: Element = Element(53);

    pub fn from_atomic_number(number: u8) -> Option<Self> {
        if (number as usize) < SYMBOLS.len() {
            Some(Element(number))
        } else {
            None
        }
    }

    /// Looks up an element by its case-sensitive symbol (`"Cl"`, not `"cl"`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS
            .iter()
            .position(|s| *s == symbol)
            .map(|number| Element(number as u8))
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    /// Normal valences used to derive implicit hydrogens of atoms written
    /// outside brackets. Empty for anything outside the organic subset.
    pub fn default_valences(self) -> &'static [u8] {
        match self {
            Element::B => &[3],
            Element::C => &[4],
            Element::N | Element::P => &[3, 5],
            Element::O => &[2],
            Element::S => &[2, 4, 6],
            Element::F | Element::CL | Element::BR | Element::I => &[1],
            _ => &[],
        }
    }

    /// Whether the element may be written without brackets.
    pub fn is_organic(self) -> bool {
        self == Element::WILDCARD || !self.default_valences().is_empty()
    }

    /// Whether the element has a lowercase aromatic spelling.
    pub fn can_be_aromatic(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::AS
                | Element::SE
                | Element::TE
        )
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(Element::from_symbol("C"), Some(Element::C));
        assert_eq!(Element::from_symbol("Cl"), Some(Element::CL));
        assert_eq!(Element::from_symbol("*"), Some(Element::WILDCARD));
        assert_eq!(Element::from_symbol("cl"), None);
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::from_atomic_number(26).map(Element::symbol), Some("Fe"));
        assert_eq!(Element::from_atomic_number(119), None);
    }

    #[test]
    fn test_organic_subset() {
        for symbol in ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I", "*"] {
            assert!(Element::from_symbol(symbol).unwrap().is_organic(), "{symbol}");
        }
        assert!(!Element::from_symbol("Fe").unwrap().is_organic());
        assert!(!Element::H.is_organic());
    }
}
