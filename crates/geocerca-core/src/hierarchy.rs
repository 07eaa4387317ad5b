//! The static administrative hierarchy (country → province → sector).
//!
//! Loaded once at startup from YAML and never mutated afterwards. Every node
//! is reachable by id, and every province and sector by the normalized key
//! of its name or any of its aliases within its country.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::normalize::{is_generic, normalize};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Country,
    Province,
    Sector,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Country => write!(f, "country"),
            NodeKind::Province => write!(f, "province"),
            NodeKind::Sector => write!(f, "sector"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: i64,
    pub name: String,
    pub kind: NodeKind,
    /// `None` only for countries.
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HierarchyFile {
    pub countries: Vec<CountryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CountryEntry {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub fallback_province: i64,
    pub fallback_sector: i64,
    #[serde(default)]
    pub provinces: Vec<ProvinceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProvinceEntry {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<SectorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SectorEntry {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Name→id lookups for one country.
#[derive(Debug, Clone)]
pub struct CountryIndex {
    id: i64,
    key: String,
    keys: Vec<String>,
    provinces: HashMap<String, i64>,
    sectors: HashMap<String, i64>,
    fallback_province: i64,
    fallback_sector: i64,
}

impl CountryIndex {
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Normalized key of the country's primary name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn province_id(&self, key: &str) -> Option<i64> {
        self.provinces.get(key).copied()
    }

    #[must_use]
    pub fn sector_id(&self, key: &str) -> Option<i64> {
        self.sectors.get(key).copied()
    }

    #[must_use]
    pub fn has_sector_key(&self, key: &str) -> bool {
        self.sectors.contains_key(key)
    }

    #[must_use]
    pub fn fallback_province(&self) -> i64 {
        self.fallback_province
    }

    #[must_use]
    pub fn fallback_sector(&self) -> i64 {
        self.fallback_sector
    }

    fn answers_to(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// Validated, read-only hierarchy.
#[derive(Debug, Clone)]
pub struct HierarchyTable {
    nodes: HashMap<i64, HierarchyNode>,
    countries: Vec<CountryIndex>,
}

impl HierarchyTable {
    #[must_use]
    pub fn node(&self, id: i64) -> Option<&HierarchyNode> {
        self.nodes.get(&id)
    }

    /// Finds a country by raw name, primary key or alias.
    #[must_use]
    pub fn country(&self, raw: &str) -> Option<&CountryIndex> {
        let key = normalize(raw);
        self.countries.iter().find(|c| c.answers_to(&key))
    }

    pub fn countries(&self) -> impl Iterator<Item = &CountryIndex> {
        self.countries.iter()
    }

    /// Sectors whose parent is `province_id`, sorted by id.
    #[must_use]
    pub fn sectors_of(&self, province_id: i64) -> Vec<&HierarchyNode> {
        let mut sectors: Vec<&HierarchyNode> = self
            .nodes
            .values()
            .filter(|n| n.kind == NodeKind::Sector && n.parent_id == Some(province_id))
            .collect();
        sectors.sort_by_key(|n| n.id);
        sectors
    }

    /// Largest id in the table, or `0` when empty.
    #[must_use]
    pub fn max_id(&self) -> i64 {
        self.nodes.keys().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|n| n.kind == kind).count()
    }

    /// Walks up from `id` until a country is reached.
    #[must_use]
    pub fn country_of(&self, id: i64) -> Option<i64> {
        let mut node = self.nodes.get(&id)?;
        while let Some(parent) = node.parent_id {
            node = self.nodes.get(&parent)?;
        }
        (node.kind == NodeKind::Country).then_some(node.id)
    }
}

/// Load and validate the hierarchy table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_hierarchy(path: &Path) -> Result<HierarchyTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::HierarchyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_hierarchy(&content)
}

/// Parse and validate a hierarchy table from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_hierarchy(yaml: &str) -> Result<HierarchyTable, ConfigError> {
    let file: HierarchyFile = serde_yaml::from_str(yaml)?;
    build_table(file)
}

fn build_table(file: HierarchyFile) -> Result<HierarchyTable, ConfigError> {
    if file.countries.is_empty() {
        return Err(ConfigError::Validation(
            "hierarchy must define at least one country".to_string(),
        ));
    }

    let mut nodes: HashMap<i64, HierarchyNode> = HashMap::new();
    let mut countries = Vec::with_capacity(file.countries.len());
    let mut seen_country_keys = HashSet::new();

    let mut insert = |node: HierarchyNode| -> Result<(), ConfigError> {
        if node.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} {} has an empty name",
                node.kind, node.id
            )));
        }
        let id = node.id;
        if nodes.insert(id, node).is_some() {
            return Err(ConfigError::Validation(format!("duplicate node id {id}")));
        }
        Ok(())
    };

    for country in file.countries {
        insert(HierarchyNode {
            id: country.id,
            name: country.name.clone(),
            kind: NodeKind::Country,
            parent_id: None,
        })?;

        let key = normalize(&country.name);
        let mut keys = vec![key.clone()];
        keys.extend(country.aliases.iter().map(|a| normalize(a)));
        for k in &keys {
            if !seen_country_keys.insert(k.clone()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate country key '{k}'"
                )));
            }
        }

        let mut provinces = HashMap::new();
        let mut sectors = HashMap::new();
        let mut sector_parents = HashMap::new();

        for province in country.provinces {
            insert(HierarchyNode {
                id: province.id,
                name: province.name.clone(),
                kind: NodeKind::Province,
                parent_id: Some(country.id),
            })?;
            for name in std::iter::once(&province.name).chain(&province.aliases) {
                register_key(&mut provinces, name, province.id, "province", &country.name)?;
            }

            for sector in province.sectors {
                insert(HierarchyNode {
                    id: sector.id,
                    name: sector.name.clone(),
                    kind: NodeKind::Sector,
                    parent_id: Some(province.id),
                })?;
                sector_parents.insert(sector.id, province.id);
                for name in std::iter::once(&sector.name).chain(&sector.aliases) {
                    if is_generic(name) {
                        return Err(ConfigError::Validation(format!(
                            "sector name '{name}' is generic and can never be matched"
                        )));
                    }
                    register_key(&mut sectors, name, sector.id, "sector", &country.name)?;
                }
            }
        }

        if !provinces.values().any(|&id| id == country.fallback_province) {
            return Err(ConfigError::Validation(format!(
                "fallback province {} is not a province of '{}'",
                country.fallback_province, country.name
            )));
        }
        if !sector_parents.contains_key(&country.fallback_sector) {
            return Err(ConfigError::Validation(format!(
                "fallback sector {} is not a sector of '{}'",
                country.fallback_sector, country.name
            )));
        }

        countries.push(CountryIndex {
            id: country.id,
            key,
            keys,
            provinces,
            sectors,
            fallback_province: country.fallback_province,
            fallback_sector: country.fallback_sector,
        });
    }

    Ok(HierarchyTable { nodes, countries })
}

fn register_key(
    index: &mut HashMap<String, i64>,
    name: &str,
    id: i64,
    kind: &str,
    country: &str,
) -> Result<(), ConfigError> {
    let key = normalize(name);
    if key.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{kind} name '{name}' normalizes to an empty key"
        )));
    }
    match index.insert(key.clone(), id) {
        Some(existing) if existing != id => Err(ConfigError::Validation(format!(
            "{kind} key '{key}' in '{country}' maps to both {existing} and {id}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "hierarchy_test.rs"]
mod tests;
