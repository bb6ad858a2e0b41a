use std::path::PathBuf;

use serde::Deserialize;

/// Where to obtain the face-embedding network definition when it is not
/// present on the device.
pub const MODEL_DOWNLOAD_LINK: &str =
    "https://drive.google.com/open?id=0B3jQsJcchixPek9lU3BaOHpCUGc";

/// Parameters for loading the embedding network.
///
/// Defaults describe the VGG-Faces graph the pipeline ships against:
/// 224x224 input, mean value 128, 4096-dimensional output taken from the
/// `fc7/fc7` layer.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// On-device path of the network definition file.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Side length of the square network input, in pixels.
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    /// Mean value subtracted from input pixels.
    #[serde(default = "default_input_mean")]
    pub input_mean: f32,

    /// Length of the produced embedding vector.
    #[serde(default = "default_output_size")]
    pub output_size: usize,

    #[serde(default = "default_input_layer")]
    pub input_layer: String,

    #[serde(default = "default_output_layer")]
    pub output_layer: String,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/vgg_faces.pb")
}

fn default_input_size() -> u32 {
    224
}

fn default_input_mean() -> f32 {
    128.0
}

fn default_output_size() -> usize {
    4096
}

fn default_input_layer() -> String {
    "Placeholder".into()
}

fn default_output_layer() -> String {
    "fc7/fc7".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_size: default_input_size(),
            input_mean: default_input_mean(),
            output_size: default_output_size(),
            input_layer: default_input_layer(),
            output_layer: default_output_layer(),
        }
    }
}
