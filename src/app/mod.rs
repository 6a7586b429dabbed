pub mod bootstrap;
pub mod session;

pub use session::DashboardSession;
