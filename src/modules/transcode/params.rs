use crate::config::profile::{Bounds, DeploymentProfile};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    Stream,
    PublicUrl,
}

/// Raw knobs as they arrived, from JSON or from multipart text fields.
#[derive(Debug, Default, Clone)]
pub struct RawParams {
    pub duration: Option<Value>,
    pub fps: Option<Value>,
    pub return_url: Option<Value>,
    pub audio: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedParams {
    pub duration: u32,
    pub fps: u32,
    pub audio: bool,
    pub delivery: DeliveryMode,
}

/// Never fails: unusable input takes the profile default, then everything is
/// clamped into the profile bounds.
pub fn resolve(raw: &RawParams, profile: &DeploymentProfile) -> ResolvedParams {
    let delivery = if coerce_flag(raw.return_url.as_ref()).unwrap_or(false) {
        DeliveryMode::PublicUrl
    } else {
        DeliveryMode::Stream
    };

    ResolvedParams {
        duration: resolve_number(raw.duration.as_ref(), &profile.duration),
        fps: resolve_number(raw.fps.as_ref(), &profile.fps),
        audio: coerce_flag(raw.audio.as_ref()).unwrap_or(profile.audio_by_default),
        delivery,
    }
}

fn resolve_number(value: Option<&Value>, bounds: &Bounds) -> u32 {
    let number = coerce_number(value).unwrap_or(bounds.default as f64);
    bounds.clamp(number.round() as i64)
}

fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn coerce_flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(duration: Option<Value>, fps: Option<Value>) -> RawParams {
        RawParams {
            duration,
            fps,
            ..RawParams::default()
        }
    }

    #[test]
    fn missing_values_take_profile_defaults() {
        let resolved = resolve(&RawParams::default(), &DeploymentProfile::standard());
        assert_eq!(resolved.duration, 5);
        assert_eq!(resolved.fps, 30);
        assert!(!resolved.audio);
        assert_eq!(resolved.delivery, DeliveryMode::Stream);
    }

    #[test]
    fn duration_is_clamp_of_coerced_value() {
        let profile = DeploymentProfile::standard();
        let cases = [
            (json!(5), 5),
            (json!(0), 1),
            (json!(-20), 1),
            (json!(61), 60),
            (json!(1e12), 60),
            (json!(4.6), 5),
            (json!("12"), 12),
            (json!(" 7 "), 7),
            (json!("abc"), 5),
            (json!(null), 5),
            (json!(true), 5),
            (json!([3]), 5),
            (json!({"s": 3}), 5),
        ];
        for (input, expected) in cases {
            let resolved = resolve(&raw(Some(input.clone()), None), &profile);
            assert_eq!(resolved.duration, expected, "input {}", input);
        }
    }

    #[test]
    fn bounds_follow_the_active_profile() {
        let resolved = resolve(
            &raw(Some(json!(45)), Some(json!(60))),
            &DeploymentProfile::low_resource(),
        );
        assert_eq!(resolved.duration, 30);
        assert_eq!(resolved.fps, 30);

        let defaults = resolve(&RawParams::default(), &DeploymentProfile::low_resource());
        assert_eq!(defaults.fps, 24);
    }

    #[test]
    fn flags_accept_form_style_strings() {
        let profile = DeploymentProfile::standard();
        for (value, mode) in [
            (json!(true), DeliveryMode::PublicUrl),
            (json!("true"), DeliveryMode::PublicUrl),
            (json!("1"), DeliveryMode::PublicUrl),
            (json!("off"), DeliveryMode::Stream),
            (json!("maybe"), DeliveryMode::Stream),
            (json!(0), DeliveryMode::Stream),
        ] {
            let params = RawParams {
                return_url: Some(value),
                ..RawParams::default()
            };
            assert_eq!(resolve(&params, &profile).delivery, mode);
        }

        let with_audio = RawParams {
            audio: Some(json!("yes")),
            ..RawParams::default()
        };
        assert!(resolve(&with_audio, &profile).audio);
    }
}
