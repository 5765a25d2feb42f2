//! API endpoint handlers.
//!
//! One module per resource. Handlers stay thin and call into the
//! workflow modules (`assessment`, `selection`) and the repository layer.

pub mod assessments;
pub mod goals;
pub mod health;
pub mod patients;
pub mod recommendations;
pub mod webhook;
