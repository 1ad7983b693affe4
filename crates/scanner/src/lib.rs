//! EcoAudit Pattern Scanner
//!
//! Deterministic, local analysis of model source code. The scanner never
//! touches the network and never fails:
//!
//! - `catalog` - Construct signatures, annotation rules, abstraction detectors
//! - `models` - `ScanFinding`, `ComplexityTier`, `StructuralAnnotation`
//! - `scanner` - `PatternScanner` and the `scan` entry point

pub mod catalog;
pub mod models;
pub mod scanner;

pub use catalog::{AnnotationRule, CallArgs, ConstructPattern};
pub use models::{ComplexityTier, ScanFinding, StructuralAnnotation, MEDIUM_TIER_THRESHOLD};
pub use scanner::{scan, PatternScanner};
