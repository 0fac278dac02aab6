use std::path::PathBuf;

use palettize::OutputFormat;
use serde::Deserialize;

pub const PATH: &str = "pixelizer.toml";

#[derive(Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub pixelize: PixelizeConfig,
}

#[derive(Deserialize)]
pub struct ServerConfig {
    /// The port under which pixelizer should serve.
    pub port: u16,
}

#[derive(Deserialize)]
pub struct CatalogConfig {
    /// The JSON palette catalog loaded at startup.
    pub path: PathBuf,
}

#[derive(Deserialize)]
pub struct PixelizeConfig {
    /// The downscale factor used when a request does not specify one.
    #[serde(default = "default_factor")]
    pub default_factor: u32,
    /// The output format used when a request does not specify one (`png` or `gif`).
    #[serde(default, with = "output_format")]
    pub default_format: OutputFormat,
}

impl Default for PixelizeConfig {
    fn default() -> Self {
        Self {
            default_factor: default_factor(),
            default_format: OutputFormat::default(),
        }
    }
}

fn default_factor() -> u32 {
    2
}

pub mod output_format {
    use palettize::OutputFormat;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OutputFormat, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
                [server]
                port = 8080

                [catalog]
                path = "palettes.json"

                [pixelize]
                default_factor = 4
                default_format = "gif"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.catalog.path, PathBuf::from("palettes.json"));
        assert_eq!(config.pixelize.default_factor, 4);
        assert_eq!(config.pixelize.default_format, OutputFormat::Gif);
    }

    #[test]
    fn pixelize_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
                [server]
                port = 80

                [catalog]
                path = "p.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.pixelize.default_factor, 2);
        assert_eq!(config.pixelize.default_format, OutputFormat::Png);
    }

    #[test]
    fn unknown_formats_are_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
                [server]
                port = 80
                [catalog]
                path = "p.json"
                [pixelize]
                default_format = "webp"
            "#,
        );
        assert!(result.is_err());
    }
}
