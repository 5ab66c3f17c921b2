//! Clustering substrate
//!
//! A clustering tree has a [`ClusteringLeaf`] and a feature generator per
//! process, and [`ClusteringFilter`]s above them merging their outputs. When
//! every thread under a leaf has terminated, the leaf asks the generator for
//! the observed addresses, each thread's data and each thread's features.

pub mod cuda;
pub mod filter;
pub mod generator;
pub mod leaf;

pub use cuda::CudaFeatureGenerator;
pub use cudascope_shared::{Feature, FeatureVector};
pub use filter::ClusteringFilter;
pub use generator::{FeatureGenerator, FeatureGeneratorComponent, GeneratorContext};
pub use leaf::ClusteringLeaf;

use cudascope_aggregator::{Pipeline, Registry};

/// Install the clustering components. Filters registered this way have a
/// fan-in of one.
pub fn register_components(registry: &mut Registry) {
    registry.register("ClusteringLeaf", || Box::new(ClusteringLeaf::new()));
    registry.register("ClusteringFilter", || Box::new(ClusteringFilter::default()));
    registry.register("CudaFeatureGenerator", || {
        Box::new(FeatureGeneratorComponent::new(CudaFeatureGenerator::new()))
    });
}

/// A leaf feeding the CUDA feature generator.
pub fn cuda_leaf_pipeline() -> Pipeline {
    Pipeline::new()
        .with_stage(Box::new(ClusteringLeaf::new()))
        .with_stage(Box::new(FeatureGeneratorComponent::new(
            CudaFeatureGenerator::new(),
        )))
}
