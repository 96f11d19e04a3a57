pub mod averages;
pub mod backup;
pub mod core;
pub mod edit;
pub mod report;
