pub mod assessment;
pub mod enums;
pub mod goal;
pub mod patient;
pub mod recommendation;

pub use assessment::*;
pub use goal::*;
pub use patient::*;
pub use recommendation::*;
