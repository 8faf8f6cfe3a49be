//! Game catalog ingestion: title extraction, external metadata validation,
//! source synchronisation, and confidence-graded merging.

pub mod error;
pub mod extract;
mod http;
pub mod igdb;
pub mod ingest;
pub mod quality;
pub mod sources;

pub use error::{CatalogError, Result};
pub use igdb::{IgdbClient, IgdbEnrichment, MetadataClient};
pub use ingest::{CatalogIngestor, IngestReport};
pub use sources::{PlaylistRecord, SourceRecord, StreamRecord};
