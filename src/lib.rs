//! Pipeline opportunity explorer.
//!
//! Loads a tabular dataset of opportunities, filters it by status, owner and
//! country, and derives the summary views shown by the terminal dashboard.

pub mod aggregate;
pub mod deadlines;
pub mod error;
pub mod explore;
pub mod filter;
pub mod loader;
pub mod render;
pub mod services;
pub mod state;
pub mod types;

pub use error::{ConfigError, DashboardError, LoadError};
pub use loader::{load_dataset, Dataset, LoadOptions};
pub use services::dashboard::{build_dashboard_view, get_dashboard, DashboardResult};
pub use state::AppState;
pub use types::{FacetField, FilterSelection, Record};
