pub mod blob_store;
pub mod layout_repair;
pub mod signing;
pub mod space_registry;
pub mod tab_config_store;
pub mod tab_persistence;
