// Asset loader module: resolves asset references (URL, file, embedded) to bytes

pub mod asset_loader;

pub use asset_loader::{AssetLoader, AssetRef};
