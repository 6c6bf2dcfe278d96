use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// JSON body of `POST /slowmo`. Numeric and flag fields stay loosely typed on
/// purpose: automation tools send `"5"` as often as `5`, and bad values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlowmoRequest {
    /// http(s) URL of the source image
    pub url: Option<String>,
    /// Clip length in seconds
    #[schema(value_type = Option<f64>, example = 5)]
    pub duration: Option<Value>,
    /// Output frame rate
    #[schema(value_type = Option<f64>, example = 30)]
    pub fps: Option<Value>,
    /// Publish the clip and answer with a URL instead of streaming it
    #[schema(value_type = Option<bool>)]
    pub return_url: Option<Value>,
    /// Attach a random background track from the audio catalog
    #[schema(value_type = Option<bool>)]
    pub audio: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishedClipResponse {
    pub success: bool,
    pub url: String,
    pub size: u64,
    pub duration: u32,
}
