//! Item requirement matching for recipes, blueprint costs and trades.
//!
//! Tier and quality are independent gates: an offered item either passes
//! both and counts in full toward the quantity, or it counts for nothing.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

pub const MAX_TIER: u8 = 3;
pub const MAX_QUALITY: u8 = 5;

/// One concrete offered item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemKey {
    pub item_id: String,
    pub tier:    u8,
    pub quality: u8,
}

impl ItemKey {
    pub fn new(item_id: impl Into<String>, tier: u8, quality: u8) -> SimResult<Self> {
        let key = Self { item_id: item_id.into(), tier, quality };
        check_id(&key.item_id)?;
        check_range("tier", tier, MAX_TIER)?;
        check_range("quality", quality, MAX_QUALITY)?;
        Ok(key)
    }

    /// Unprocessed stock: tier 1, quality 1.
    pub fn raw(item_id: &str) -> Self {
        Self { item_id: item_id.to_string(), tier: 1, quality: 1 }
    }
}

/// A stack of identical items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub key: ItemKey,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequirement {
    pub item_id:      String,
    pub min_tier:     u8,
    pub min_quality:  u8,
    pub min_quantity: u32,
}

impl ItemRequirement {
    pub fn new(
        item_id: impl Into<String>,
        min_tier: u8,
        min_quality: u8,
        min_quantity: u32,
    ) -> SimResult<Self> {
        let req = Self { item_id: item_id.into(), min_tier, min_quality, min_quantity };
        req.validate()?;
        Ok(req)
    }

    /// Check a requirement that arrived through deserialization.
    pub fn validate(&self) -> SimResult<()> {
        check_id(&self.item_id)?;
        check_range("minTier", self.min_tier, MAX_TIER)?;
        check_range("minQuality", self.min_quality, MAX_QUALITY)?;
        if self.min_quantity == 0 {
            return Err(SimError::rejected("minQuantity must be greater than 0"));
        }
        Ok(())
    }

    /// Whether a single item passes the id, tier and quality gates.
    pub fn admits(&self, key: &ItemKey) -> bool {
        key.item_id == self.item_id
            && key.tier >= self.min_tier
            && key.quality >= self.min_quality
    }
}

fn check_id(item_id: &str) -> SimResult<()> {
    if item_id.trim().is_empty() {
        return Err(SimError::rejected("item id must not be blank"));
    }
    Ok(())
}

fn check_range(field: &str, value: u8, max: u8) -> SimResult<()> {
    if value < 1 || value > max {
        return Err(SimError::rejected(format!("{field} must be between 1 and {max}")));
    }
    Ok(())
}

/// True iff the offered items that pass every gate add up to the
/// required quantity. Each offered key is one unit.
pub fn accepts(requirement: &ItemRequirement, offered: &[ItemKey]) -> bool {
    let matching = offered.iter().filter(|k| requirement.admits(k)).count() as u64;
    matching >= u64::from(requirement.min_quantity)
}

/// Like [`accepts`] over stacks; a passing stack counts its full `qty`.
pub fn accepts_stacks(requirement: &ItemRequirement, offered: &[ItemStack]) -> bool {
    let matching: u64 = offered
        .iter()
        .filter(|s| requirement.admits(&s.key))
        .map(|s| u64::from(s.qty))
        .sum();
    matching >= u64::from(requirement.min_quantity)
}

/// Every requirement is met by `offered`.
pub fn accepts_all(requirements: &[ItemRequirement], offered: &[ItemStack]) -> bool {
    requirements.iter().all(|r| accepts_stacks(r, offered))
}

/// A crafting recipe as shipped in content packs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDefinition {
    pub id:          String,
    pub inputs:      Vec<ItemRequirement>,
    pub output_item: String,
    #[serde(default = "one")]
    pub output_qty:  u32,
}

fn one() -> u32 {
    1
}

impl RecipeDefinition {
    pub fn validate(&self) -> SimResult<()> {
        check_id(&self.id)?;
        check_id(&self.output_item)?;
        self.inputs.iter().try_for_each(ItemRequirement::validate)
    }

    pub fn is_satisfied_by(&self, offered: &[ItemStack]) -> bool {
        accepts_all(&self.inputs, offered)
    }
}
