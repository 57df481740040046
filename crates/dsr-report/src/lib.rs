//! Population sink: substitutes resolved field text into the output
//! template and accounts for every placeholder.

pub mod populate;
pub mod report;

pub use populate::{PopulatedDocument, find_placeholders, populate};
pub use report::PopulationReport;
