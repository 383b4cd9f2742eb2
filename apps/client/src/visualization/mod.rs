// Visualization Loader: fetches the similarity graph for an entity, exposes a
// Loading/Ready/Error view state and owns the fetched image's local handle.

pub mod handle;
pub mod loader;

pub use handle::{HandleLedger, ResourceHandle};
pub use loader::{VisualizationLoader, VisualizationViewState, LOAD_FAILURE_MESSAGE};
