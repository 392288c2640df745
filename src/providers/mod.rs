//! Agency data-provider integrations
//!
//! Each provider implements [`SceneProvider`]: searching its agency API for
//! scenes in a publication window and mapping the provider's scene documents
//! to STAC items.
//!
//! Authentication flows are out of scope: providers receive static
//! credentials or tokens from configuration and send them as-is.

pub mod esa_cdse;
pub mod nasa_cmr;
pub mod provider;
pub mod usgs_m2m;

pub use esa_cdse::CdseProvider;
pub use nasa_cmr::CmrProvider;
pub use provider::{SceneProvider, SearchWindow};
pub use usgs_m2m::{DownloadOption, UsgsM2mProvider};
