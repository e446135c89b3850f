use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use tracing::warn;

use whatsapp_cell::ReplyButton;

use crate::models::Treatment;

/// Static treatment catalog, loaded once at startup and shared read-only.
pub struct TreatmentCatalog {
    by_id: HashMap<String, Treatment>,
    ordered: Vec<Treatment>,
}

impl TreatmentCatalog {
    pub fn load(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read treatment catalog {}", path))?;
        let ordered: Vec<Treatment> = serde_json::from_str(&raw)
            .with_context(|| format!("treatment catalog {} is not valid JSON", path))?;
        Ok(Self::from_treatments(ordered))
    }

    pub fn from_treatments(ordered: Vec<Treatment>) -> Self {
        let by_id = ordered
            .iter()
            .map(|t| (t.id.clone(), t.clone()))
            .collect();
        Self { by_id, ordered }
    }

    pub fn get(&self, id: &str) -> Option<&Treatment> {
        self.by_id.get(id)
    }

    /// Treatment menu in catalog order. The Cloud API caps interactive
    /// reply buttons at 3 per message.
    pub fn menu_buttons(&self) -> Vec<ReplyButton> {
        self.ordered
            .iter()
            .take(3)
            .map(|t| ReplyButton::new(t.id.clone(), t.name.clone()))
            .collect()
    }
}

/// Named patient-facing texts with `{placeholder}` substitution, loaded
/// from `templates.json` once at startup.
pub struct MessageTemplates {
    templates: HashMap<String, String>,
}

impl MessageTemplates {
    pub fn load(path: &str) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("cannot read templates {}", path))?;
        let templates: HashMap<String, String> = serde_json::from_str(&raw)
            .with_context(|| format!("templates {} is not a JSON object of strings", path))?;
        Ok(Self { templates })
    }

    pub fn from_map(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    pub fn get(&self, name: &str) -> &str {
        match self.templates.get(name) {
            Some(text) => text,
            None => {
                warn!("Template {} is missing", name);
                ""
            }
        }
    }

    pub fn render(&self, name: &str, substitutions: &[(&str, String)]) -> String {
        let mut text = self.get(name).to_string();
        for (key, value) in substitutions {
            text = text.replace(&format!("{{{}}}", key), value);
        }
        text
    }
}
