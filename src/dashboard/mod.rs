//! Dashboard module
//!
//! Provides the headline figures and the net worth history for the overview
//! screen of the logged in user.

mod net_worth;
mod summary;

pub use net_worth::{
    NET_WORTH_SERIES_DAYS, NetWorthPoint, build_net_worth_series, net_worth_endpoint,
};
pub use summary::{DashboardSummary, dashboard_summary_endpoint};

pub(crate) use net_worth::NetWorthState;
pub(crate) use summary::DashboardState;
