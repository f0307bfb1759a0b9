use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::error::{check_max_len, require_text};
use almox_core::{CategoryId, DomainError, DomainResult, Entity, ProductId, UnitId};

use crate::low_stock::is_low_stock;
use crate::quantity::Quantity;

/// Inventory item kept in the warehouse.
///
/// `quantity_current` is owned by the ledger: it starts at zero and only
/// [`crate::ledger::apply_movement`] changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    description: String,
    category_id: Option<CategoryId>,
    unit_id: UnitId,
    quantity_current: Quantity,
    quantity_minimum: Quantity,
    location: String,
    notes: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Editable fields of a product (create and update form).
///
/// The current balance is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub unit_id: UnitId,
    #[serde(default)]
    pub quantity_minimum: Decimal,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Flat persisted representation of a product, used by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub unit_id: UnitId,
    pub quantity_current: Decimal,
    pub quantity_minimum: Decimal,
    pub location: String,
    pub notes: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct ValidDraft {
    code: String,
    name: String,
    description: String,
    category_id: Option<CategoryId>,
    unit_id: UnitId,
    quantity_minimum: Quantity,
    location: String,
    notes: String,
    active: bool,
}

impl ProductDraft {
    fn validate(self) -> DomainResult<ValidDraft> {
        require_text("code", &self.code, 50)?;
        require_text("name", &self.name, 200)?;
        check_max_len("location", &self.location, 100)?;
        let quantity_minimum = Quantity::new(self.quantity_minimum)
            .map_err(|e| DomainError::validation(format!("quantity_minimum: {e}")))?;

        Ok(ValidDraft {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category_id: self.category_id,
            unit_id: self.unit_id,
            quantity_minimum,
            location: self.location.trim().to_string(),
            notes: self.notes.trim().to_string(),
            active: self.active,
        })
    }
}

impl Product {
    /// Create a product with an empty balance.
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let d = draft.validate()?;
        Ok(Self {
            id,
            code: d.code,
            name: d.name,
            description: d.description,
            category_id: d.category_id,
            unit_id: d.unit_id,
            quantity_current: Quantity::ZERO,
            quantity_minimum: d.quantity_minimum,
            location: d.location,
            notes: d.notes,
            active: d.active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply form edits. Leaves the balance and creation time untouched.
    pub fn update(&mut self, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<()> {
        let d = draft.validate()?;
        self.code = d.code;
        self.name = d.name;
        self.description = d.description;
        self.category_id = d.category_id;
        self.unit_id = d.unit_id;
        self.quantity_minimum = d.quantity_minimum;
        self.location = d.location;
        self.notes = d.notes;
        self.active = d.active;
        self.updated_at = now;
        Ok(())
    }

    /// Soft delete.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    /// Drop the category reference (the category was deleted).
    pub fn clear_category(&mut self, now: DateTime<Utc>) {
        self.category_id = None;
        self.updated_at = now;
    }

    /// Rebuild a product from storage, re-checking the balance invariants.
    pub fn restore(record: ProductRecord) -> DomainResult<Self> {
        let quantity_current = Quantity::new(record.quantity_current)
            .map_err(|e| DomainError::invariant(format!("stored quantity_current: {e}")))?;
        let quantity_minimum = Quantity::new(record.quantity_minimum)
            .map_err(|e| DomainError::invariant(format!("stored quantity_minimum: {e}")))?;

        Ok(Self {
            id: record.id,
            code: record.code,
            name: record.name,
            description: record.description,
            category_id: record.category_id,
            unit_id: record.unit_id,
            quantity_current,
            quantity_minimum,
            location: record.location,
            notes: record.notes,
            active: record.active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Flatten for persistence.
    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            unit_id: self.unit_id,
            quantity_current: self.quantity_current.value(),
            quantity_minimum: self.quantity_minimum.value(),
            location: self.location.clone(),
            notes: self.notes.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn set_balance(&mut self, quantity: Quantity, now: DateTime<Utc>) {
        self.quantity_current = quantity;
        self.updated_at = now;
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn quantity_current(&self) -> Quantity {
        self.quantity_current
    }

    pub fn quantity_minimum(&self) -> Quantity {
        self.quantity_minimum
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.quantity_current, self.quantity_minimum)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> ProductDraft {
        ProductDraft {
            code: "PAP-001".to_string(),
            name: "Papel A4".to_string(),
            description: String::new(),
            category_id: None,
            unit_id: UnitId::new(),
            quantity_minimum: dec!(5),
            location: "Prateleira 3".to_string(),
            notes: String::new(),
            active: true,
        }
    }

    #[test]
    fn create_starts_with_empty_balance() {
        let product = Product::create(ProductId::new(), draft(), Utc::now()).unwrap();
        assert_eq!(product.quantity_current(), Quantity::ZERO);
        assert_eq!(product.quantity_minimum().to_string(), "5.00");
        assert!(product.is_low_stock());
        assert_eq!(product.to_string(), "PAP-001 - Papel A4");
    }

    #[test]
    fn create_rejects_negative_minimum() {
        let err = Product::create(
            ProductId::new(),
            ProductDraft { quantity_minimum: dec!(-1), ..draft() },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_blank_code() {
        let err = Product::create(
            ProductId::new(),
            ProductDraft { code: "  ".to_string(), ..draft() },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("code cannot be empty"));
    }

    #[test]
    fn update_preserves_balance_and_creation_time() {
        let created = Utc::now();
        let mut product = Product::create(ProductId::new(), draft(), created).unwrap();
        product.set_balance(Quantity::new(dec!(10)).unwrap(), created);

        let later = created + chrono::Duration::minutes(5);
        product
            .update(ProductDraft { name: "Papel A4 75g".to_string(), ..draft() }, later)
            .unwrap();

        assert_eq!(product.name(), "Papel A4 75g");
        assert_eq!(product.quantity_current(), Quantity::new(dec!(10)).unwrap());
        assert_eq!(product.created_at(), created);
        assert_eq!(product.updated_at(), later);
    }

    #[test]
    fn restore_rejects_negative_stored_balance() {
        let now = Utc::now();
        let record = ProductRecord {
            id: ProductId::new(),
            code: "X".to_string(),
            name: "X".to_string(),
            description: String::new(),
            category_id: None,
            unit_id: UnitId::new(),
            quantity_current: dec!(-1),
            quantity_minimum: dec!(0),
            location: String::new(),
            notes: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            Product::restore(record),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
