pub mod sync_settings;

pub use sync_settings::SyncSettings;
