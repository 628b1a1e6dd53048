//! Remote participants - names, colors and cursor positions of the other
//! clients editing the same document.

use quire_core::Selection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Colors for remote cursors.
pub struct CursorColors;

impl CursorColors {
    /// Fallback palette for clients that have not announced a name.
    pub const COLORS: [&'static str; 12] = [
        "#E91E63", // Pink
        "#9C27B0", // Purple
        "#3F51B5", // Indigo
        "#2196F3", // Blue
        "#00BCD4", // Cyan
        "#009688", // Teal
        "#4CAF50", // Green
        "#8BC34A", // Light Green
        "#CDDC39", // Lime
        "#FF9800", // Orange
        "#FF5722", // Deep Orange
        "#795548", // Brown
    ];

    /// Get a palette color for a client based on its id.
    pub fn color_for_id(client_id: &str) -> &'static str {
        let hash: usize = client_id.bytes().map(|b| b as usize).sum();
        Self::COLORS[hash % Self::COLORS.len()]
    }

    /// Hue in `[0, 1)` derived from a display name.
    pub fn hue_from_name(name: &str) -> f64 {
        let hue = name
            .encode_utf16()
            .fold(1u32, |acc, unit| 17 * (acc + unit as u32) % 360);
        hue as f64 / 360.0
    }

    /// `#rrggbb` for an HSL color with all components in `[0, 1]`.
    pub fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
        if saturation == 0.0 {
            return Self::rgb_to_hex(lightness, lightness, lightness);
        }
        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - saturation * lightness
        };
        let p = 2.0 * lightness - q;
        let channel = |mut h: f64| {
            if h < 0.0 {
                h += 1.0;
            }
            if h > 1.0 {
                h -= 1.0;
            }
            if 6.0 * h < 1.0 {
                p + (q - p) * 6.0 * h
            } else if 2.0 * h < 1.0 {
                q
            } else if 3.0 * h < 2.0 {
                p + (q - p) * 6.0 * (2.0 / 3.0 - h)
            } else {
                p
            }
        };
        Self::rgb_to_hex(
            channel(hue + 1.0 / 3.0),
            channel(hue),
            channel(hue - 1.0 / 3.0),
        )
    }

    fn rgb_to_hex(r: f64, g: f64, b: f64) -> String {
        let digits = |n: f64| (255.0 * n).round().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", digits(r), digits(g), digits(b))
    }
}

/// What the server reports about a participant when a client joins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteClientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

/// Another participant as seen by this client.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteClient {
    pub id: String,
    pub name: Option<String>,
    /// Cursor color.
    pub color: String,
    /// Highlight color for non-empty selections.
    pub light_color: String,
    pub selection: Option<Selection>,
}

impl RemoteClient {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let color = CursorColors::color_for_id(&id).to_string();
        Self {
            id,
            name: None,
            light_color: color.clone(),
            color,
            selection: None,
        }
    }

    pub fn from_info(id: impl Into<String>, info: RemoteClientInfo) -> Self {
        let mut client = Self::new(id);
        let name = info.name.unwrap_or_else(|| client.id.clone());
        client.set_name(&name);
        if let Some(color) = info.color {
            client.set_color(&color);
        }
        client.selection = info.selection;
        client
    }

    /// Returns false if the name was unchanged.
    pub fn set_name(&mut self, name: &str) -> bool {
        if self.name.as_deref() == Some(name) {
            return false;
        }
        self.name = Some(name.to_string());
        let hue = CursorColors::hue_from_name(name);
        self.color = CursorColors::hsl_to_hex(hue, 0.75, 0.5);
        self.light_color = CursorColors::hsl_to_hex(hue, 0.5, 0.9);
        true
    }

    /// Use a fixed color chosen by the participant.
    pub fn set_color(&mut self, color: &str) {
        self.color = color.to_string();
        self.light_color = color.to_string();
    }

    pub fn update_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn remove_selection(&mut self) {
        self.selection = None;
    }

    /// Color to draw the current selection with.
    pub fn selection_color(&self) -> &str {
        match &self.selection {
            Some(selection) if selection.something_selected() => &self.light_color,
            _ => &self.color,
        }
    }
}

/// All remote participants, keyed by client id.
#[derive(Clone, Debug, Default)]
pub struct RemoteClients {
    clients: HashMap<String, RemoteClient>,
}

impl RemoteClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_infos(infos: HashMap<String, RemoteClientInfo>) -> Self {
        let clients = infos
            .into_iter()
            .map(|(id, info)| (id.clone(), RemoteClient::from_info(id, info)))
            .collect();
        Self { clients }
    }

    pub fn get(&self, client_id: &str) -> Option<&RemoteClient> {
        self.clients.get(client_id)
    }

    /// Look up a participant, registering it if this is the first we hear of it.
    pub fn get_or_insert(&mut self, client_id: &str) -> &mut RemoteClient {
        self.clients
            .entry(client_id.to_string())
            .or_insert_with(|| RemoteClient::new(client_id))
    }

    pub fn remove(&mut self, client_id: &str) -> Option<RemoteClient> {
        self.clients.remove(client_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteClient> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
