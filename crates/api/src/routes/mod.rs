//! API Routes

pub mod detection;
pub mod status;
pub mod video;
