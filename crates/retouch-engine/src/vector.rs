//! Parameter vector (de)serialization.
//!
//! [`context_to_vector`] flattens every free scalar parameter of a
//! context — per layer: opacity first, then each stored adjustment's
//! parameters — into a numeric vector plus a positional key describing
//! each slot. The enumeration order is deterministic and documented:
//! layer order, then ascending adjustment type, then lexicographic
//! parameter names. Selective color always emits its full 9x4 grid
//! (channels, then colors, both lexicographic; unset entries read the
//! 0.5 neutral) so that adjustment's schema never depends on which
//! entries were explicitly configured.
//!
//! The key serializes to the JSON shape exchanged with the optimizer
//! collaborator: `layerName`, `adjustmentType` (integer), a
//! parameter-level `adjustmentName`, `value`, and for selective color an
//! embedded `selectiveColor: {channel, color}` pair.
//!
//! A key is only valid against a context with the same layer set and
//! order that produced it; using a stale key after structural edits
//! (layer add/remove/reorder) is the caller's responsibility to avoid.

use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::layer::AdjustmentType;
use serde::{Deserialize, Serialize};

/// Selective-color slot address inside a key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectiveColorRef {
    /// Channel name (e.g. `reds`, `neutrals`).
    pub channel: String,
    /// CMYK color name within the channel.
    pub color: String,
}

/// One slot of the flattened parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    /// Owning layer.
    #[serde(rename = "layerName")]
    pub layer_name: String,
    /// Adjustment type (the sentinel `Opacity` for opacity slots),
    /// serialized as its integer value.
    #[serde(rename = "adjustmentType")]
    pub adjustment_type: AdjustmentType,
    /// Parameter name within the adjustment.
    #[serde(rename = "adjustmentName")]
    pub adjustment_name: String,
    /// Value at the time the key was built.
    pub value: f64,
    /// Set only for selective-color grid slots.
    #[serde(rename = "selectiveColor", skip_serializing_if = "Option::is_none", default)]
    pub selective_color: Option<SelectiveColorRef>,
}

/// Positional description of a flattened parameter vector.
pub type ParamKey = Vec<ParamEntry>;

/// Selective-color channels in emission order.
pub use retouch_ops::SELECTIVE_COLOR_CHANNELS;
/// Selective-color colors in emission order.
pub use retouch_ops::SELECTIVE_COLOR_COLORS;

/// Flattens a context's free parameters into `(vector, key)`.
pub fn context_to_vector(c: &Context) -> (Vec<f64>, ParamKey) {
    let mut vector = Vec::new();
    let mut key = Vec::new();

    for name in c.order() {
        let Some(layer) = c.layer(name) else { continue };

        let mut push = |ty: AdjustmentType, pname: &str, sc: Option<SelectiveColorRef>, v: f64| {
            key.push(ParamEntry {
                layer_name: name.clone(),
                adjustment_type: ty,
                adjustment_name: pname.to_string(),
                value: v,
                selective_color: sc,
            });
            vector.push(v);
        };

        push(
            AdjustmentType::Opacity,
            "opacity",
            None,
            layer.opacity() as f64,
        );

        for (ty, params) in layer.adjustments() {
            if ty == AdjustmentType::SelectiveColor {
                for channel in SELECTIVE_COLOR_CHANNELS {
                    for color in SELECTIVE_COLOR_COLORS {
                        let v = layer.selective_color_channel(channel, color) as f64;
                        push(
                            ty,
                            "selectiveColor",
                            Some(SelectiveColorRef {
                                channel: channel.to_string(),
                                color: color.to_string(),
                            }),
                            v,
                        );
                    }
                }
            } else {
                for (pname, &v) in params {
                    push(ty, pname, None, v as f64);
                }
            }
        }
    }

    (vector, key)
}

/// Rebuilds a context from a base context, a key, and a same-length
/// value vector.
///
/// # Errors
///
/// Fails when the lengths disagree or the key names a layer the base
/// context does not contain.
pub fn vector_to_context(vector: &[f64], key: &ParamKey, base: &Context) -> Result<Context> {
    if vector.len() != key.len() {
        return Err(EngineError::KeyVectorMismatch {
            key_len: key.len(),
            vec_len: vector.len(),
        });
    }

    let mut out = base.clone();
    for (entry, &value) in key.iter().zip(vector) {
        let Some(layer) = out.layer_mut(&entry.layer_name) else {
            return Err(EngineError::UnknownLayer(entry.layer_name.clone()));
        };
        let value = value as f32;

        match entry.adjustment_type {
            AdjustmentType::Opacity => layer.set_opacity(value),
            AdjustmentType::SelectiveColor => {
                let Some(sc) = &entry.selective_color else {
                    return Err(EngineError::MalformedKeyEntry {
                        layer: entry.layer_name.clone(),
                        reason: "selective color entry without channel/color".into(),
                    });
                };
                layer.set_selective_color_channel(sc.channel.clone(), sc.color.clone(), value);
            }
            ty => layer.add_adjustment(ty, entry.adjustment_name.clone(), value),
        }
    }

    Ok(out)
}

/// Serializes a key to the JSON exchange form.
pub fn key_to_json(key: &ParamKey) -> serde_json::Result<String> {
    serde_json::to_string_pretty(key)
}

/// Parses a key from the JSON exchange form.
pub fn key_from_json(s: &str) -> serde_json::Result<ParamKey> {
    serde_json::from_str(s)
}
