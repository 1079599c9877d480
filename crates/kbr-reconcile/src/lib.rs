//! The reconciliation engine: Keycloak entity schemas, the dependency-aware
//! Exporter and Importer, and the three-way Differ.

pub mod differ;
pub mod exporter;
pub mod importer;
pub mod kinds;
pub mod schemas;

pub use differ::{diff_all, diff_kind};
pub use exporter::{export_all, export_one};
pub use importer::{ImportReport, KindImportReport, import_all, import_one};
pub use kinds::build_registry;
