use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::schema::{ToolSchema, ToolSpec};
use crate::toolkit::ToolkitSpec;

pub const SPOTIFY_TOOLKIT_ID: &str = "spotify";

/// The Spotify toolkit takes no configuration; the user's linked account is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SpotifyParameters {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum SpotifyTool {
    GetPlaylists,
}

impl SpotifyTool {
    pub fn schema(self) -> ToolSchema {
        match self {
            SpotifyTool::GetPlaylists => GetPlaylistsTool::schema(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetPlaylistsParams {
    /// Maximum number of playlists to return (1-50)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 50))]
    pub limit: Option<u32>,
    /// Index of the first playlist to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

pub struct GetPlaylistsTool;

impl ToolSpec for GetPlaylistsTool {
    type Params = GetPlaylistsParams;

    const NAME: &'static str = "get-playlists";
    const DISPLAY_NAME: &'static str = "Get Playlists";
    const DESCRIPTION: &'static str = "List the playlists owned or followed by the current Spotify user.";
}

pub struct SpotifyToolkit;

impl ToolkitSpec for SpotifyToolkit {
    type Parameters = SpotifyParameters;

    const ID: &'static str = SPOTIFY_TOOLKIT_ID;
    const NAME: &'static str = "Spotify";
    const DESCRIPTION: &'static str = "Browse the user's Spotify library.";

    fn tools() -> Vec<ToolSchema> {
        SpotifyTool::iter().map(SpotifyTool::schema).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::ToolkitDefinition;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn tool_names_are_kebab_case() {
        assert_eq!(SpotifyTool::GetPlaylists.to_string(), "get-playlists");
        assert_eq!(
            SpotifyTool::from_str("get-playlists").unwrap(),
            SpotifyTool::GetPlaylists
        );
        assert_eq!(GetPlaylistsTool::NAME, SpotifyTool::GetPlaylists.to_string());
    }

    #[test]
    fn get_playlists_schema_is_optional_paging() {
        let schema = GetPlaylistsTool::schema();
        assert!(schema.input_schema.properties.contains_key("limit"));
        assert!(schema.input_schema.properties.contains_key("offset"));
        assert!(schema.input_schema.required.is_empty());
    }

    #[test]
    fn empty_object_is_the_only_shape_accepted() {
        let definition = ToolkitDefinition::from_spec::<SpotifyToolkit>().unwrap();

        assert_eq!(definition.validate_parameters(&json!({})).unwrap(), json!({}));
        assert_eq!(
            definition
                .validate_parameters(&json!({ "ignored": 1 }))
                .unwrap(),
            json!({})
        );
        assert!(definition.validate_parameters(&json!("nope")).is_err());
        assert_eq!(
            definition.qualified_tool_names(),
            vec!["spotify_get-playlists".to_string()]
        );
    }
}
