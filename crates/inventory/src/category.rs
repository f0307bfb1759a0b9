use serde::{Deserialize, Serialize};

use almox_core::error::require_text;
use almox_core::{CategoryId, DomainResult, Entity};

/// Grouping used to organize products in listings and filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Category {
    pub fn create(id: CategoryId, draft: CategoryDraft) -> DomainResult<Self> {
        require_text("name", &draft.name, 100)?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            active: draft.active,
        })
    }

    pub fn update(&mut self, draft: CategoryDraft) -> DomainResult<()> {
        *self = Self::create(self.id, draft)?;
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_blank_name() {
        let draft = CategoryDraft {
            name: " ".to_string(),
            description: String::new(),
            active: true,
        };
        assert!(Category::create(CategoryId::new(), draft).is_err());
    }

    #[test]
    fn draft_defaults_to_active() {
        let draft: CategoryDraft = serde_json::from_str(r#"{"name":"Limpeza"}"#).unwrap();
        assert!(draft.active);
        assert!(draft.description.is_empty());
    }
}
