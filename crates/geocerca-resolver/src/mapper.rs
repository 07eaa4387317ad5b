//! Maps detected province/sector names onto hierarchy ids.
//!
//! Lookup order for sectors: the static table, then aliases created by the
//! alias workflow, then sectors registered through it. The static table is
//! never modified. Unmatched names resolve to the country's configured
//! fallbacks, so [`HierarchyMapper::map`] always yields an assignment.

use std::collections::HashMap;
use std::sync::Arc;

use geocerca_core::hierarchy::CountryIndex;
use geocerca_core::{is_generic, normalize, HierarchyNode, HierarchyTable, NodeKind};

use crate::error::ResolveError;

/// Result of [`HierarchyMapper::map`]. Ids are always present; the flags
/// tell exact matches apart from fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyMatch {
    pub province_id: i64,
    pub sector_id: i64,
    pub province_matched: bool,
    pub sector_matched: bool,
}

#[derive(Debug, Clone)]
pub struct HierarchyMapper {
    table: Arc<HierarchyTable>,
    country: CountryIndex,
    aliases: HashMap<String, i64>,
    registered: HashMap<i64, HierarchyNode>,
    registered_keys: HashMap<String, i64>,
}

impl HierarchyMapper {
    /// Binds a mapper to the country named `country` (raw name, key or alias).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownCountry`] when the table has no such country.
    pub fn new(table: Arc<HierarchyTable>, country: &str) -> Result<Self, ResolveError> {
        let country = table
            .country(country)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownCountry(country.to_owned()))?;
        Ok(Self {
            table,
            country,
            aliases: HashMap::new(),
            registered: HashMap::new(),
            registered_keys: HashMap::new(),
        })
    }

    #[must_use]
    pub fn country_id(&self) -> i64 {
        self.country.id()
    }

    #[must_use]
    pub fn table(&self) -> &HierarchyTable {
        &self.table
    }

    #[must_use]
    pub fn fallback_sector(&self) -> i64 {
        self.country.fallback_sector()
    }

    /// Sector id for an already-normalized key, if any lookup layer knows it.
    #[must_use]
    pub fn sector_for_key(&self, key: &str) -> Option<i64> {
        if key.is_empty() {
            return None;
        }
        self.country
            .sector_id(key)
            .or_else(|| self.aliases.get(key).copied())
            .or_else(|| self.registered_keys.get(key).copied())
    }

    /// Sector node by id, from the static table or registered sectors,
    /// restricted to the bound country.
    #[must_use]
    pub fn sector(&self, sector_id: i64) -> Option<&HierarchyNode> {
        if let Some(node) = self.registered.get(&sector_id) {
            return Some(node);
        }
        self.table
            .node(sector_id)
            .filter(|n| n.kind == NodeKind::Sector)
            .filter(|n| self.table.country_of(n.id) == Some(self.country.id()))
    }

    /// Maps raw province and sector names onto ids.
    ///
    /// A matched sector overrides the province with the sector's own parent,
    /// keeping the assignment consistent with the tree. Generic sector names
    /// never match.
    #[must_use]
    pub fn map(&self, province_raw: &str, sector_raw: &str) -> HierarchyMatch {
        let province = self.country.province_id(&normalize(province_raw));

        let sector = if is_generic(sector_raw) {
            None
        } else {
            self.sector_for_key(&normalize(sector_raw))
        };
        let sector_parent = sector.and_then(|id| self.sector(id)).and_then(|n| n.parent_id);

        match (sector, sector_parent) {
            (Some(sector_id), Some(parent)) => HierarchyMatch {
                province_id: parent,
                sector_id,
                province_matched: true,
                sector_matched: true,
            },
            _ => HierarchyMatch {
                province_id: province.unwrap_or(self.country.fallback_province()),
                sector_id: self.country.fallback_sector(),
                province_matched: province.is_some(),
                sector_matched: false,
            },
        }
    }

    /// Adds `key` as an extra name for `sector_id`. Returns `false` when the
    /// key is already known to any lookup layer.
    pub fn add_alias(&mut self, key: &str, sector_id: i64) -> bool {
        if key.is_empty() || self.sector_for_key(key).is_some() {
            return false;
        }
        self.aliases.insert(key.to_owned(), sector_id);
        true
    }

    /// Makes a freshly created sector resolvable by `key`.
    pub fn register_sector(&mut self, key: &str, node: HierarchyNode) {
        self.registered_keys.insert(key.to_owned(), node.id);
        self.registered.insert(node.id, node);
    }
}
