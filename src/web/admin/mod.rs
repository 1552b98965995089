mod actions;
mod dashboard;
mod types;

pub use actions::admin_action;
pub use dashboard::dashboard;
pub use types::{AdminTab, DashboardQuery};
