use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// `None` makes the map unbounded along that axis.
    pub block_width: Option<u32>,
    pub block_height: Option<u32>,
    pub block_length: f32,

    pub bounce_multiplier: f32,
    pub friction_accel_mag: f32,

    /// Snapshots buffered per networked character.
    pub interpolation_capacity: usize,
    pub input_buffer_size: usize,
    pub event_capacity: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            block_width: Some(10),
            block_height: Some(10),
            block_length: 50.0,

            bounce_multiplier: 0.8,
            friction_accel_mag: 0.0002,

            interpolation_capacity: 32,
            input_buffer_size: 256,
            event_capacity: 1024,
        }
    }
}

impl SceneConfig {
    pub fn pixel_width(&self) -> Option<f32> {
        self.block_width.map(|w| w as f32 * self.block_length)
    }

    pub fn pixel_height(&self) -> Option<f32> {
        self.block_height.map(|h| h as f32 * self.block_length)
    }
}

/// Movement tunables and behaviour flags of one locally simulated character.
/// Speeds are px/ms, accelerations px/ms², rotation rad/ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub size: Vec2,
    pub max_hp: i32,
    pub max_speed: f32,
    pub movement_accel_mag: f32,
    pub rotate_speed: f32,

    pub custom_bounce_multiplier: Option<f32>,
    pub auto_v_bounce: bool,
    pub auto_h_bounce: bool,
    pub disable_backpedal: bool,
    pub wrap_map: bool,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            size: Vec2::splat(30.0),
            max_hp: 1000,
            max_speed: 0.087,
            movement_accel_mag: 0.0003,
            rotate_speed: 0.0035,

            custom_bounce_multiplier: None,
            auto_v_bounce: false,
            auto_h_bounce: false,
            disable_backpedal: false,
            wrap_map: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SceneConfig =
            serde_json::from_str(r#"{"block_width": null, "bounce_multiplier": 0.5}"#).unwrap();
        assert_eq!(config.block_width, None);
        assert_eq!(config.block_height, Some(10));
        assert_eq!(config.bounce_multiplier, 0.5);
        assert_eq!(config.pixel_width(), None);
        assert_eq!(config.pixel_height(), Some(500.0));
    }
}
