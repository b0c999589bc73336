use crate::theme::Theme;
use crate::thickness::{MAX_THICKNESS, MIN_THICKNESS, ThicknessRange};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub threshold: f64,
    /// Touchpoints `1..=touchpoint_universe` seed the spanning forest.
    pub touchpoint_universe: u32,
    /// Stage number standing in for the conversion sink in statistics keys.
    pub conversion_alias: u32,
    pub min_thickness: u32,
    pub max_thickness: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 16000.0,
            touchpoint_universe: 201,
            conversion_alias: 201,
            min_thickness: MIN_THICKNESS,
            max_thickness: MAX_THICKNESS,
        }
    }
}

impl PipelineConfig {
    pub fn thickness_range(&self) -> ThicknessRange {
        ThicknessRange::new(self.min_thickness, self.max_thickness)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub node_width: f32,
    pub node_height: f32,
    pub minimum_port_distance: f32,
    pub port_border_gap_ratio: f32,
    pub margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 30.0,
            rank_spacing: 160.0,
            node_width: 180.0,
            node_height: 20.0,
            minimum_port_distance: 0.0,
            port_border_gap_ratio: 1.0,
            margin: 8.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub layout: LayoutConfig,
    pub theme: Theme,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    pipeline: Option<PipelineConfig>,
    layout: Option<LayoutConfig>,
    theme_variables: Option<ThemeVariables>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    hue: Option<f64>,
    saturation: Option<f64>,
    lightness_margin: Option<f64>,
    new_node_color: Option<[u8; 3]>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Strict JSON first; JSON5 (comments, trailing commas) as a fallback.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|err| anyhow::anyhow!("invalid config ({json_err}; json5: {err})"))?,
    };

    let mut config = Config::default();
    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "grayscale" | "gray" => config.theme = Theme::grayscale(),
            "default" | "blue" => config.theme = Theme::journey_blue(),
            other => anyhow::bail!("unknown theme {other:?}"),
        }
    }
    if let Some(pipeline) = parsed.pipeline {
        config.pipeline = pipeline;
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.hue {
            config.theme.hue = v;
        }
        if let Some(v) = vars.saturation {
            config.theme.saturation = v;
        }
        if let Some(v) = vars.lightness_margin {
            config.theme.lightness_margin = v;
        }
        if let Some(v) = vars.new_node_color {
            config.theme.new_node_color = v;
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(parse_config("{}").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"{"pipeline": {"threshold": 500}, "layout": {"node_spacing": 12}}"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.threshold, 500.0);
        assert_eq!(config.pipeline.touchpoint_universe, 201);
        assert_eq!(config.layout.node_spacing, 12.0);
        assert_eq!(config.layout.node_width, 180.0);
    }

    #[test]
    fn accepts_json5_and_theme_overrides() {
        let config = parse_config(
            r#"{
                // lenient input
                theme: "grayscale",
                themeVariables: { hue: 120, newNodeColor: [1, 2, 3], },
            }"#,
        )
        .unwrap();
        assert_eq!(config.theme.hue, 120.0);
        assert_eq!(config.theme.saturation, 0.0);
        assert_eq!(config.theme.new_node_color, [1, 2, 3]);
    }

    #[test]
    fn rejects_unknown_theme() {
        assert!(parse_config(r#"{"theme": "neon"}"#).is_err());
    }

    #[test]
    fn thickness_range_is_ordered() {
        let pipeline = PipelineConfig {
            min_thickness: 50,
            max_thickness: 10,
            ..Default::default()
        };
        assert_eq!(pipeline.thickness_range(), ThicknessRange::new(10, 50));
    }
}
