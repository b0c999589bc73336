use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const CONVERSION_TOKEN: &str = "F";
pub const CONVERSION_LABEL: &str = "Conversion";
pub const MISSING_NAME_LABEL: &str = "\u{2205}";

const STAGE_PREFIX: char = 'M';
const URL_PREFIXES: [&str; 2] = ["https://www.", "http://www."];

/// A journey stage. Numeric stages come from the dataset; `Conversion` is the
/// terminal sink every journey flows into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TouchpointId {
    Stage(u32),
    Conversion,
}

impl TouchpointId {
    pub fn is_conversion(self) -> bool {
        matches!(self, Self::Conversion)
    }

    pub fn stage(self) -> Option<u32> {
        match self {
            Self::Stage(id) => Some(id),
            Self::Conversion => None,
        }
    }

    /// Accepts `12`, `M12` and the conversion sentinel `F`.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        let token = token.strip_prefix(STAGE_PREFIX).unwrap_or(token);
        if token == CONVERSION_TOKEN {
            return Some(Self::Conversion);
        }
        token.parse::<u32>().ok().map(Self::Stage)
    }

    /// Stage number used in transition-statistics keys; the conversion sink is
    /// addressed through `conversion_alias` there.
    pub fn stats_key_id(self, conversion_alias: u32) -> u32 {
        match self {
            Self::Stage(id) => id,
            Self::Conversion => conversion_alias,
        }
    }
}

impl fmt::Display for TouchpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(id) => write!(f, "{id}"),
            Self::Conversion => f.write_str(CONVERSION_TOKEN),
        }
    }
}

impl Serialize for TouchpointId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TouchpointId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TouchpointVisitor;

        impl Visitor<'_> for TouchpointVisitor {
            type Value = TouchpointId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a touchpoint id (integer, \"M<n>\" or \"F\")")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map(TouchpointId::Stage)
                    .map_err(|_| E::custom(format!("touchpoint id {value} out of range")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map(TouchpointId::Stage)
                    .map_err(|_| E::custom(format!("touchpoint id {value} out of range")))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                if value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX) {
                    Ok(TouchpointId::Stage(value as u32))
                } else {
                    Err(E::custom(format!("touchpoint id {value} is not an integer")))
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                TouchpointId::from_token(value)
                    .ok_or_else(|| E::custom(format!("invalid touchpoint id {value:?}")))
            }
        }

        deserializer.deserialize_any(TouchpointVisitor)
    }
}

/// Display label for a touchpoint: the conversion sink is "Conversion",
/// stages use their cleaned name or the empty-set glyph when unnamed.
pub fn resolve_label(id: TouchpointId, name: Option<&str>) -> String {
    match id {
        TouchpointId::Conversion => CONVERSION_LABEL.to_string(),
        TouchpointId::Stage(_) => name
            .map(clean_url)
            .unwrap_or_else(|| MISSING_NAME_LABEL.to_string()),
    }
}

/// Drops the scheme + "www." prefix (first occurrence of each form) and a
/// single trailing slash.
pub fn clean_url(name: &str) -> String {
    let mut cleaned = name.to_string();
    for prefix in URL_PREFIXES {
        if let Some(pos) = cleaned.find(prefix) {
            cleaned.replace_range(pos..pos + prefix.len(), "");
        }
    }
    if cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}
