pub mod loader;
pub mod types;

pub use loader::{DEFAULT_PLAYLIST_PATH, PlaylistLoader};
pub use types::{
    DEFAULT_FPS, DisplayConfig, FramesScene, FxScene, GotoScene, MappingConfig, Playlist,
    SceneKind, StopCondition, TileConfig,
};
