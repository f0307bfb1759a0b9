use serde::{Deserialize, Serialize};

use almox_core::error::{check_max_len, require_text};
use almox_core::{DomainResult, Entity, UnitId};

/// Unit of measure a product is counted in (`kg`, `L`, `m`, `un`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    pub id: UnitId,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub active: bool,
}

/// Editable fields of a unit of measure (create and update form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDraft {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl UnitDraft {
    fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name, 50)?;
        require_text("symbol", &self.symbol, 10)?;
        check_max_len("description", &self.description, 100)
    }
}

impl UnitOfMeasure {
    pub fn create(id: UnitId, draft: UnitDraft) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            symbol: draft.symbol.trim().to_string(),
            description: draft.description.trim().to_string(),
            active: draft.active,
        })
    }

    pub fn update(&mut self, draft: UnitDraft) -> DomainResult<()> {
        *self = Self::create(self.id, draft)?;
        Ok(())
    }
}

impl Entity for UnitOfMeasure {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, symbol: &str) -> UnitDraft {
        UnitDraft {
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: String::new(),
            active: true,
        }
    }

    #[test]
    fn create_trims_and_displays_name_with_symbol() {
        let unit = UnitOfMeasure::create(UnitId::new(), draft("  Quilograma ", " kg ")).unwrap();
        assert_eq!(unit.to_string(), "Quilograma (kg)");
    }

    #[test]
    fn create_rejects_long_symbol() {
        assert!(UnitOfMeasure::create(UnitId::new(), draft("Caixa", "caixa-grande")).is_err());
    }

    #[test]
    fn update_keeps_identity() {
        let id = UnitId::new();
        let mut unit = UnitOfMeasure::create(id, draft("Litro", "L")).unwrap();
        unit.update(UnitDraft { active: false, ..draft("Litro", "l") }).unwrap();
        assert_eq!(unit.id, id);
        assert_eq!(unit.symbol, "l");
        assert!(!unit.active);
    }
}
