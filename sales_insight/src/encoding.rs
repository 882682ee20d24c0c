//! Categorical encoding of store, product, category and region labels
//!
//! The dataset stores every categorical attribute as a small integer code.
//! [`CategoryEncoder`] owns the label ↔ code tables. The tables are fixed for
//! the lifetime of the process; they come either from the built-in version 1
//! tables or from a versioned TOML artifact shipped next to the dataset.

use crate::data::SalesDataset;
use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Integer code of a categorical label
pub type Code = u32;

/// The categorical columns of the sales dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryField {
    #[serde(rename = "Store ID")]
    StoreId,
    #[serde(rename = "Product Name")]
    ProductName,
    #[serde(rename = "Category")]
    Category,
    #[serde(rename = "Region")]
    Region,
}

impl CategoryField {
    /// Every field, in column order
    pub const ALL: [CategoryField; 4] = [
        CategoryField::StoreId,
        CategoryField::ProductName,
        CategoryField::Category,
        CategoryField::Region,
    ];

    /// Column name used by the dataset and the label artifact
    pub fn column_name(&self) -> &'static str {
        match self {
            CategoryField::StoreId => "Store ID",
            CategoryField::ProductName => "Product Name",
            CategoryField::Category => "Category",
            CategoryField::Region => "Region",
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for CategoryField {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        CategoryField::ALL
            .into_iter()
            .find(|field| field.column_name() == s)
            .ok_or_else(|| InsightError::ConfigError(format!("Unknown category field '{s}'")))
    }
}

const BUILTIN_VERSION: u32 = 1;

const STORE_IDS: [&str; 5] = ["S001", "S002", "S003", "S004", "S005"];

const PRODUCT_NAMES: [&str; 20] = [
    "Air Filter",
    "Alternator",
    "Battery",
    "Brake Pad",
    "Coolant",
    "Disc Rotor",
    "Engine Oil",
    "Fans",
    "Fuse",
    "LED",
    "Radiator",
    "Rearview Mirror",
    "Resistors",
    "Sensor",
    "Sideview Mirror",
    "Spark Plugs",
    "Thermostat",
    "Water Pump",
    "Windshield",
    "Wires",
];

const CATEGORIES: [&str; 5] = [
    "Accessories",
    "Breaks",
    "Cooling System",
    "Electrical",
    "Engine",
];

const REGIONS: [&str; 4] = ["East", "North", "South", "West"];

/// On-disk form of a label artifact
#[derive(Debug, Deserialize)]
struct LabelArtifact {
    version: u32,
    fields: BTreeMap<String, BTreeMap<String, Code>>,
}

/// Bidirectional label ↔ code mapping for every categorical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEncoder {
    version: u32,
    labels: BTreeMap<CategoryField, BTreeMap<String, Code>>,
    codes: BTreeMap<CategoryField, BTreeMap<Code, String>>,
}

impl CategoryEncoder {
    /// The version 1 tables the sales dataset was encoded with
    pub fn builtin() -> Self {
        let table = |labels: &[&str]| -> BTreeMap<String, Code> {
            labels
                .iter()
                .zip(0..)
                .map(|(label, code)| (label.to_string(), code))
                .collect()
        };

        let mut tables = BTreeMap::new();
        tables.insert(CategoryField::StoreId, table(&STORE_IDS[..]));
        tables.insert(CategoryField::ProductName, table(&PRODUCT_NAMES[..]));
        tables.insert(CategoryField::Category, table(&CATEGORIES[..]));
        tables.insert(CategoryField::Region, table(&REGIONS[..]));

        Self::build(BUILTIN_VERSION, tables)
    }

    /// Build an encoder from explicit tables, validating that it is closed and bijective
    pub fn from_tables(
        version: u32,
        tables: BTreeMap<CategoryField, BTreeMap<String, Code>>,
    ) -> Result<Self> {
        for field in CategoryField::ALL {
            let table = tables.get(&field).ok_or_else(|| {
                InsightError::ConfigError(format!("Label table for '{field}' is missing"))
            })?;
            if table.is_empty() {
                return Err(InsightError::ConfigError(format!(
                    "Label table for '{field}' is empty"
                )));
            }

            let mut seen = BTreeSet::new();
            for (label, code) in table {
                if !seen.insert(*code) {
                    return Err(InsightError::ConfigError(format!(
                        "Code {code} is used twice in '{field}' (second label '{label}')"
                    )));
                }
            }
        }

        Ok(Self::build(version, tables))
    }

    /// Parse a versioned TOML label artifact
    ///
    /// ```toml
    /// version = 2
    ///
    /// [fields."Store ID"]
    /// S001 = 0
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let artifact: LabelArtifact = toml::from_str(contents)
            .map_err(|e| InsightError::ConfigError(format!("Invalid label artifact: {e}")))?;

        let mut tables = BTreeMap::new();
        for (name, table) in artifact.fields {
            let field: CategoryField = name.parse()?;
            tables.insert(field, table);
        }

        Self::from_tables(artifact.version, tables)
    }

    /// Load a versioned TOML label artifact from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    fn build(version: u32, labels: BTreeMap<CategoryField, BTreeMap<String, Code>>) -> Self {
        let codes = labels
            .iter()
            .map(|(field, table)| {
                let reverse = table
                    .iter()
                    .map(|(label, code)| (*code, label.clone()))
                    .collect();
                (*field, reverse)
            })
            .collect();

        Self {
            version,
            labels,
            codes,
        }
    }

    /// Version of the tables
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Code for an exact, case-sensitive label; `None` if the label is unknown
    pub fn encode(&self, field: CategoryField, label: &str) -> Option<Code> {
        self.labels.get(&field)?.get(label).copied()
    }

    /// Label for a code; `None` if the code is unknown
    pub fn decode(&self, field: CategoryField, code: Code) -> Option<&str> {
        self.codes.get(&field)?.get(&code).map(String::as_str)
    }

    /// Like [`encode`](Self::encode), but an unknown label becomes an error
    pub fn require(&self, field: CategoryField, label: &str) -> Result<Code> {
        self.encode(field, label)
            .ok_or_else(|| InsightError::UnknownCategory {
                field,
                label: label.to_string(),
            })
    }

    /// Fail unless the code is known for the field
    pub fn require_code(&self, field: CategoryField, code: Code) -> Result<()> {
        match self.decode(field, code) {
            Some(_) => Ok(()),
            None => Err(InsightError::UnknownCategory {
                field,
                label: code.to_string(),
            }),
        }
    }

    /// Known labels of a field, ordered by label
    pub fn labels(&self, field: CategoryField) -> impl Iterator<Item = (&str, Code)> + '_ {
        self.labels
            .get(&field)
            .into_iter()
            .flat_map(|table| table.iter().map(|(label, code)| (label.as_str(), *code)))
    }

    /// Number of labels known for a field
    pub fn len(&self, field: CategoryField) -> usize {
        self.labels.get(&field).map_or(0, BTreeMap::len)
    }

    /// Codes present in the dataset that this encoder cannot decode
    pub fn unknown_codes(&self, dataset: &SalesDataset) -> BTreeMap<CategoryField, BTreeSet<Code>> {
        let mut unknown: BTreeMap<CategoryField, BTreeSet<Code>> = BTreeMap::new();

        for record in dataset.records() {
            let fields = [
                (CategoryField::StoreId, record.store_id),
                (CategoryField::ProductName, record.product_name),
                (CategoryField::Category, record.category),
                (CategoryField::Region, record.region),
            ];
            for (field, code) in fields {
                if self.decode(field, code).is_none() {
                    unknown.entry(field).or_default().insert(code);
                }
            }
        }

        unknown
    }
}

impl Default for CategoryEncoder {
    fn default() -> Self {
        Self::builtin()
    }
}
