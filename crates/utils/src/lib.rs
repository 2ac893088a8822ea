pub mod canonical;
pub mod logging;
pub mod response;
