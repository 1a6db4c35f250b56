//! The selection set: option name to chosen value, read from a JSON brief.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::JobError;

/// Option names understood by the prompt assembler.
pub mod keys {
    #![allow(missing_docs)]
    pub const GENDER: &str = "gender";
    pub const AGE: &str = "age";
    pub const ETHNICITY: &str = "ethnicity";
    pub const HAIR_COLOR: &str = "hair_color";
    pub const HAIR_TEXTURE: &str = "hair_texture";
    pub const HAIR_STYLE: &str = "hair_style";
    pub const EYE_COLOR: &str = "eye_color";
    pub const SKIN: &str = "skin";
    pub const CLOTHING: &str = "clothing";
    pub const MAKEUP: &str = "makeup";
    pub const POSE: &str = "pose";
    pub const GAZE: &str = "gaze";
    pub const EXPRESSION: &str = "expression";
    pub const WIND: &str = "wind";
    pub const CAMERA_MOVE: &str = "camera_move";
    pub const FILM_LOOK: &str = "film_look";
    pub const FRAMING: &str = "framing";
    pub const LENS: &str = "lens";
    pub const PRODUCT: &str = "product";
    pub const OBJECT_TYPE: &str = "object_type";
    pub const OBJECT_SIZE_CM: &str = "object_size_cm";
    pub const WEAR_PRODUCT: &str = "wear_product";
    pub const ASPECT_RATIO: &str = "aspect_ratio";
    pub const WEATHER: &str = "weather";
    pub const BACKGROUND: &str = "background";
    pub const BACKGROUND_COLOR: &str = "background_color";
    pub const LIGHTING: &str = "lighting";
    pub const AD_COPY: &str = "ad_copy";
}

#[allow(clippy::expect_used)]
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex colour pattern compiles"));

/// Flat option-name to value mapping, rebuilt for each run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    values: BTreeMap<String, String>,
}

impl SelectionSet {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object. Scalars are stored as their text form; nulls are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self, JobError> {
        let parsed: BTreeMap<String, Value> = serde_json::from_str(raw)?;
        let mut selection = Self::new();
        for (key, value) in parsed {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(JobError::Validation(format!(
                        "option {key} must be a scalar, got {other}"
                    )));
                }
            };
            selection.values.insert(key, text);
        }
        Ok(selection)
    }

    /// Reads a JSON brief from disk.
    pub fn from_path(path: &Path) -> Result<Self, JobError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets or replaces one option.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Applies a `key=value` override.
    pub fn apply_override(&mut self, raw: &str) -> Result<(), JobError> {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(JobError::Validation(format!(
                "override must look like key=value: {raw}"
            )));
        };
        self.set(key.trim(), value.trim());
        Ok(())
    }

    /// Trimmed value, `None` when missing or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Value or the given default.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Boolean option; accepts `true`, `yes`, `on` and `1`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            )
        })
    }

    /// Numeric option.
    pub fn number(&self, key: &str) -> Result<Option<f32>, JobError> {
        self.get(key)
            .map(|value| {
                value.parse::<f32>().map_err(|_| {
                    JobError::Validation(format!("option {key} is not a number: {value}"))
                })
            })
            .transpose()
    }

    /// The product being advertised.
    pub fn product(&self) -> Option<&str> {
        self.get(keys::PRODUCT)
    }

    /// Checks the preconditions for submitting the brief.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.product().is_none() {
            return Err(JobError::Validation("a product is required".to_string()));
        }
        if let Some(color) = self.get(keys::BACKGROUND_COLOR)
            && !is_hex_color(color)
        {
            return Err(JobError::Validation(format!(
                "background colour must be #RRGGBB, got {color}"
            )));
        }
        if let Some(size) = self.number(keys::OBJECT_SIZE_CM)?
            && !(size > 0.0 && size.is_finite())
        {
            return Err(JobError::Validation(format!(
                "object size must be positive, got {size}"
            )));
        }
        Ok(())
    }

    /// Iterates all options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}
