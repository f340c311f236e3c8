use anyhow::{anyhow, Context, Result};
use tracing::metadata::LevelFilter;

mod element;
pub use element::*;

mod parse;
pub use parse::*;

mod molecule;
pub use molecule::*;

mod canon;
pub use canon::*;

mod write;
pub use write::*;

mod deepsmiles;
pub use deepsmiles::*;

mod tokenize;
pub use tokenize::*;

mod randomize;
pub use randomize::*;

mod driver;
pub use driver::*;

/// Tetrahedral chirality as written after the atom symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Chirality {
    /// `@` (or `@TH1`)
    Anticlockwise,
    /// `@@` (or `@TH2`)
    Clockwise,
    /// Allene, square planar, trigonal bipyramidal and octahedral classes,
    /// kept verbatim and never reoriented.
    Other(String),
}

impl Chirality {
    pub fn inverted(&self) -> Self {
        match self {
            Chirality::Anticlockwise => Chirality::Clockwise,
            Chirality::Clockwise => Chirality::Anticlockwise,
            Chirality::Other(tag) => Chirality::Other(tag.clone()),
        }
    }

    pub fn is_tetrahedral(&self) -> bool {
        !matches!(self, Chirality::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Chirality::Anticlockwise => "@",
            Chirality::Clockwise => "@@",
            Chirality::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub chirality: Option<Chirality>,
    /// `Some` when the count was written inside brackets, `None` when the
    /// atom was written bare and its hydrogens are implicit.
    pub hydrogens: Option<u8>,
    pub charge: i8,
    pub class: Option<u32>,
}

impl Atom {
    /// An atom written without brackets.
    pub fn organic(element: Element, aromatic: bool) -> Self {
        Self {
            element,
            aromatic,
            isotope: None,
            chirality: None,
            hydrogens: None,
            charge: 0,
            class: None,
        }
    }

    pub fn is_bracketed(&self) -> bool {
        self.hydrogens.is_some()
    }

    /// Whether the chirality tag refers to a neighbour ordering that
    /// includes a bracket hydrogen.
    pub fn has_stereo_hydrogen(&self) -> bool {
        self.chirality.as_ref().is_some_and(Chirality::is_tetrahedral)
            && self.hydrogens.unwrap_or(0) > 0
    }

    /// Element symbol, lowercase for aromatic atoms.
    pub fn symbol(&self) -> String {
        if self.aromatic {
            self.element.symbol().to_ascii_lowercase()
        } else {
            self.element.symbol().to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    /// `/`, read from the edge source towards the edge target.
    Up,
    /// `\`, read from the edge source towards the edge target.
    Down,
}

impl Bond {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(Bond::Single),
            '=' => Some(Bond::Double),
            '#' => Some(Bond::Triple),
            '$' => Some(Bond::Quadruple),
            ':' => Some(Bond::Aromatic),
            '/' => Some(Bond::Up),
            '\\' => Some(Bond::Down),
            _ => None,
        }
    }

    /// Bond order as counted for implicit hydrogens; aromatic bonds count 1.
    pub fn order(self) -> u8 {
        match self {
            Bond::Single | Bond::Aromatic | Bond::Up | Bond::Down => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
            Bond::Quadruple => 4,
        }
    }

    /// The same bond read in the opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Bond::Up => Bond::Down,
            Bond::Down => Bond::Up,
            other => other,
        }
    }

    pub fn is_directional(self) -> bool {
        matches!(self, Bond::Up | Bond::Down)
    }
}

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

/// Installs a stderr `tracing` subscriber.
///
/// `level` is one of `off`, `error`, `warn`, `info`, `debug`, `trace`.
pub fn init_logging(level: &str) -> Result<()> {
    let filter: LevelFilter = level
        .parse()
        .context(format!("Unknown log level '{level}'"))?;
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {e}"))?;
    Ok(())
}
