//! Canonical column names shared across the pipeline.
//!
//! The export formats downstream of this tool are fixed protocol artifacts,
//! so these names (accents included) must match the historical files exactly.

/// Canonical join key across all three sources.
pub const REFERENCE: &str = "RéférenceProduit";
/// Current-period classification code from the internal catalogue.
pub const CURRENT_M2: &str = "M2_annee_actuelle";
/// Prior-period classification code from the historical snapshot.
pub const PREVIOUS_M2: &str = "M2_annee_derniere";
/// Client-assigned family code.
pub const CLIENT_CODE: &str = "Code_famille_Client";
/// Constant batch label attached to every merged row.
pub const ENTITY: &str = "Entreprise";

/// Descriptor columns carried through from the historical snapshot when
/// present under exactly these names.
pub const HISTORY_DESCRIPTORS: [&str; 6] = [
    "MACH2_FAM",
    "FAMI_LIBELLE",
    "MACH2_SFAM",
    "SFAMI_LIBELLE",
    "MACH2_FONC",
    "FONC_LIBELLE",
];
