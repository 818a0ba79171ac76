//! Market-price estimation for sports-management game players: weighted
//! comparable-sale aggregation with a trained decision-tree fallback, plus
//! auction expiry timing helpers.

pub mod comparables;
pub mod curves;
pub mod estimator;
pub mod model;
pub mod pricing;
pub mod record;
pub mod sales_db;
pub mod schedule;
pub mod scoring;
