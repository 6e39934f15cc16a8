pub mod spotify;

pub use spotify::{SPOTIFY_TOOLKIT_ID, SpotifyToolkit};
