//! Wire contract of the image annotation backend: feature identifiers, the
//! annotation result schema and the cloud bucket listing.

pub mod defs;
pub mod error;
pub mod likelihood;
pub mod result;

pub use defs::{reshape_listing, CloudImageInfo, Feature, FeatureSet, ImageSource, ListInfoDictionary, ListInfoEntry};
pub use error::DefsError;
pub use likelihood::Likelihood;
pub use result::*;
