//! Frame extraction, batching, normalization and bucketization, tied together
//! by [`SpectrumPipeline`].

pub mod batch;
pub mod bucket;
pub mod framer;
pub mod normalize;
pub mod pipeline;
pub mod region;

pub use batch::{batch_magnitude, BatchAnalyzer, MagnitudeSource};
pub use bucket::{bucketize, Bucket, BucketMap, BucketParams, DbRange};
pub use framer::{extract_frame, Framer};
pub use normalize::{convergence_steps, Normalizer, SmoothingState, OUTPUT_CEILING};
pub use pipeline::{PipelineStats, SignalHandle, SpectrumPipeline};
pub use region::{RegionLayout, Segment, SpectrumRegion};
