pub mod activity;
pub mod review;
pub mod sweep;
