//! Chroma REST wire types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Bgr;
use crate::config::ServiceSettings;
use crate::matrix::ColorMatrix;

/// Device classes a session exposes an endpoint for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Keyboard,
    Mouse,
    Mousepad,
    Headset,
    Keypad,
    Chromalink,
}

impl Device {
    pub const ALL: [Self; 6] = [
        Self::Keyboard,
        Self::Mouse,
        Self::Mousepad,
        Self::Headset,
        Self::Keypad,
        Self::Chromalink,
    ];

    /// Devices that only get a static color; the keyboard gets frames.
    pub const SECONDARY: [Self; 5] = [
        Self::Mouse,
        Self::Mousepad,
        Self::Headset,
        Self::Keypad,
        Self::Chromalink,
    ];

    /// Path segment of the device endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
            Self::Mousepad => "mousepad",
            Self::Headset => "headset",
            Self::Keypad => "keypad",
            Self::Chromalink => "chromalink",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    pub contact: String,
}

/// Body of the registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDescriptor {
    pub title: String,
    pub description: String,
    pub author: Author,
    pub device_supported: Vec<Device>,
    pub category: String,
}

impl AppDescriptor {
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self {
            title: settings.title.clone(),
            description: settings.description.clone(),
            author: Author {
                name: settings.author.clone(),
                contact: settings.contact.clone(),
            },
            device_supported: Device::ALL.to_vec(),
            category: "application".to_string(),
        }
    }
}

/// Registration reply; only `uri` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    pub uri: String,
    #[serde(default)]
    pub sessionid: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaticParam {
    pub color: Bgr,
}

/// Effect bodies accepted by device endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "param")]
pub enum Effect {
    #[serde(rename = "CHROMA_CUSTOM")]
    Custom(ColorMatrix),
    #[serde(rename = "CHROMA_STATIC")]
    Static(StaticParam),
}

impl Effect {
    pub const fn solid(color: Bgr) -> Self {
        Self::Static(StaticParam { color })
    }
}
