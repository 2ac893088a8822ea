pub mod blob;
pub mod fidget;
pub mod grid_layout;
pub mod signed;
pub mod space_registration;
pub mod tab_config;
