// Quotation data: client details and the selected line items.

use crate::error::{QuoteError, QuoteResult, ValidationError};
use crate::pricing::{coerce_price, coerce_price_value, coerce_quantity, coerce_quantity_value};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Service,
    Package,
}

/// One selected service or package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default = "generate_item_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub unit_price: u64,
    /// Usually days of coverage
    #[serde(default = "default_quantity", deserialize_with = "deserialize_quantity")]
    pub quantity_units: u32,
}

fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_quantity() -> u32 {
    1
}

/// Numeric form field as it arrives in JSON, either a number or raw text.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldInput {
    Number(f64),
    Text(String),
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<FieldInput>::deserialize(deserializer)? {
        Some(FieldInput::Number(value)) => coerce_quantity_value(value),
        Some(FieldInput::Text(raw)) => coerce_quantity(&raw),
        None => default_quantity(),
    })
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<FieldInput>::deserialize(deserializer)? {
        Some(FieldInput::Number(value)) => coerce_price_value(value),
        Some(FieldInput::Text(raw)) => coerce_price(&raw),
        None => 0,
    })
}

impl LineItem {
    pub fn new(name: impl Into<String>, unit_price: u64, quantity_units: u32) -> Self {
        Self {
            id: generate_item_id(),
            name: name.into(),
            description: String::new(),
            category: Category::Service,
            unit_price,
            quantity_units: quantity_units.max(1),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    pub event_date: NaiveDate,
}

// ============================================================================
// Item Set
// ============================================================================

/// Ordered, never-empty selection of line items.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSet {
    items: Vec<LineItem>,
}

impl ItemSet {
    pub fn new(first: LineItem) -> Self {
        Self { items: vec![first] }
    }

    pub fn from_items(items: Vec<LineItem>) -> QuoteResult<Self> {
        if items.is_empty() {
            return Err(QuoteError::LastItem);
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn add(&mut self, item: LineItem) {
        self.items.push(item);
    }

    pub fn remove(&mut self, id: &str) -> QuoteResult<LineItem> {
        let index = self.position(id)?;
        if self.items.len() == 1 {
            return Err(QuoteError::LastItem);
        }
        Ok(self.items.remove(index))
    }

    /// Applies raw quantity text from the form, coercing bad entries to 1.
    pub fn set_quantity_input(&mut self, id: &str, raw: &str) -> QuoteResult<u32> {
        let index = self.position(id)?;
        let quantity = coerce_quantity(raw);
        self.items[index].quantity_units = quantity;
        Ok(quantity)
    }

    /// Applies raw price text from the form, coercing bad entries to 0.
    pub fn set_price_input(&mut self, id: &str, raw: &str) -> QuoteResult<u64> {
        let index = self.position(id)?;
        let price = coerce_price(raw);
        self.items[index].unit_price = price;
        Ok(price)
    }

    fn position(&self, id: &str) -> QuoteResult<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| QuoteError::UnknownItem(id.to_string()))
    }
}

// ============================================================================
// Quotation
// ============================================================================

/// Transient document request; consumed by one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Quotation {
    pub client: Client,
    pub items: ItemSet,
    pub generated_at: NaiveDateTime,
}

impl Quotation {
    pub fn new(client: Client, items: ItemSet, generated_at: NaiveDateTime) -> Self {
        Self {
            client,
            items,
            generated_at,
        }
    }

    pub fn total_amount(&self) -> u64 {
        crate::pricing::total_amount(self.items.items())
    }

    /// Checks the fields that must be filled before generation is allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client.name.trim().is_empty() {
            return Err(ValidationError::MissingClientName);
        }
        if self.client.mobile.trim().is_empty() {
            return Err(ValidationError::MissingClientMobile);
        }
        if let Some(index) = self
            .items
            .items()
            .iter()
            .position(|item| item.name.trim().is_empty())
        {
            return Err(ValidationError::UnnamedItem { index });
        }
        Ok(())
    }

    /// Whether the generate trigger should be enabled.
    pub fn can_generate(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Form state as handed over by the selection screens.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotationRequest {
    pub client: Client,
    pub items: Vec<LineItem>,
}

impl QuotationRequest {
    pub fn from_json_str(content: &str) -> QuoteResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| QuoteError::Config(format!("Invalid request JSON: {}", e)))
    }

    pub fn into_quotation(self, generated_at: NaiveDateTime) -> QuoteResult<Quotation> {
        let items = ItemSet::from_items(self.items)?;
        Ok(Quotation::new(self.client, items, generated_at))
    }
}
