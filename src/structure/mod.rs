//! PDF logical structure (Tagged PDFs).
//!
//! Standard structure types, RoleMap resolution, the structure-tree
//! walker, the figure alt-text lookup, and the table model.

pub mod figures;
pub mod standards;
pub mod tables;
pub mod walker;

pub use figures::FigureAltLookup;
pub use standards::{
    is_standard_type, resolve_role_type, standard_mapping_for, BUILT_IN_ROLE_MAP,
    STANDARD_STRUCTURE_TYPES,
};
pub use tables::{build_table_model, TableCell, TableModel};
pub use walker::StructureWalker;
