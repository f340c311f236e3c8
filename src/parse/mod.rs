mod bracket;
pub use bracket::*;

mod smiles;
pub use smiles::*;
