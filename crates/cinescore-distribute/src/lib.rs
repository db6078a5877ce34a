//! Cinescore distribution crate - the remote artifact store, the
//! generation manifest, push and pull of the latest artifact set, and
//! verified loading of that set on the serving side.

pub mod bundle;
pub mod distributor;
pub mod manifest;
pub mod store;

pub use bundle::{ArtifactSet, LocalArtifacts, LoadedModel};
pub use distributor::{Distributor, TransferReport};
pub use manifest::{sha256_hex, Manifest, ManifestEntry};
pub use store::{store_from_config, ArtifactStore, FsStore, HttpStore};
