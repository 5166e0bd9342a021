pub mod applications;
pub mod catalog;
pub mod gateway;
pub mod listings;
pub mod reconcile;
pub mod snapshot;
pub mod verifier;
