pub mod analytics_loader;
pub mod poller;
pub mod reconciler;
pub mod store;

pub use analytics_loader::{load_initial_analytics, refresh_backtest};
pub use poller::{PollSettings, Poller};
pub use reconciler::{reconcile, resolve_equity, Sources};
pub use store::{PollLoop, SourceUpdate, ViewStore};
