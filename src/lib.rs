//! Transcript edit-and-translate engine for neoepitope discovery.
//!
//! Applies phased haplotype variants to annotated transcripts, translates
//! the resulting coding sequence, and enumerates the novel peptide k-mers
//! a reference translation doesn't contain. See each module for the piece
//! of that pipeline it owns.

pub mod aggregator;
pub mod annotation;
pub mod config;
pub mod edit;
pub mod error;
pub mod genome;
pub mod interval_index;
pub mod router;
pub mod segment;
pub mod sequence;
pub mod transcript;

pub use aggregator::{PeptideAggregator, PeptideMetadata};
pub use config::{NeoepitopeConfig, NeoepitopeConfigBuilder};
pub use error::NeoepitopeError;
pub use router::{HaplotypeRouter, PhasedBlock, RawVariant};
pub use transcript::{EditArg, Inclusion, StartCodonPolicy, Transcript};
