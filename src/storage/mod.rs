//! Persistent storage of produced artifacts

pub mod artifact;

pub use artifact::{Artifact, ArtifactStore, PartialFile};
