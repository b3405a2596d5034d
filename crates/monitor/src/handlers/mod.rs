//! Service operations, grouped by what they act on

pub mod alerts;
pub mod messages;
pub mod readings;
pub mod workers;
