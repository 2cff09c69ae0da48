pub mod chunk;
pub mod decode;
pub mod recovery;
pub mod aggregate;
pub mod partition;
pub mod archive;
pub mod pipeline;
pub mod inspect;
pub mod manifest;

pub use chunk::ChunkFile;
pub use decode::{decode, DecodeError, DecodeStrategy};
pub use recovery::{extract_partial, PartialExtract, PartialExtractor};
pub use aggregate::{aggregate, Aggregation, FileReport, FileStatus};
pub use partition::{partition, shard_size, Shard};
pub use archive::{archive, ArchiveOutcome};
pub use pipeline::{run, RepartitionOptions, RunReport};
