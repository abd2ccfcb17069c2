//! Visitor tracking: client address resolution, reverse DNS enrichment and
//! record assembly.

pub mod ip_extractor;
pub mod recorder;
pub mod reverse_dns;

pub use ip_extractor::{resolve_client, ResolvedClient};
pub use recorder::VisitRecorder;
pub use reverse_dns::{HickoryPtrLookup, PtrLookup, ReverseDns};
