use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Response of `GET /config/providers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderCatalog {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
    /// Provider id to default model id.
    #[serde(default)]
    pub default: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Backend model selector sent with every prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(rename = "providerID")]
    pub provider_id: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

impl ModelRef {
    pub fn new(provider_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.model_id)
    }
}

impl ProviderCatalog {
    /// All `(provider, model)` id pairs in catalog order.
    pub fn model_refs(&self) -> Vec<ModelRef> {
        self.providers
            .iter()
            .flat_map(|p| {
                p.models
                    .values()
                    .map(move |m| ModelRef::new(p.id.clone(), m.id.clone()))
            })
            .collect()
    }
}
