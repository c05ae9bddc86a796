pub mod health;
pub mod metrics;
pub mod orphans;
pub mod students;
