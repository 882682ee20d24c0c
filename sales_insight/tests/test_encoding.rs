use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_insight::encoding::{CategoryEncoder, CategoryField};
use sales_insight::{InsightError, SalesDataset, SalesRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tempfile::NamedTempFile;

#[rstest]
#[case(CategoryField::StoreId, "S001", 0)]
#[case(CategoryField::StoreId, "S005", 4)]
#[case(CategoryField::ProductName, "Air Filter", 0)]
#[case(CategoryField::ProductName, "Battery", 2)]
#[case(CategoryField::ProductName, "Rearview Mirror", 11)]
#[case(CategoryField::ProductName, "Wires", 19)]
#[case(CategoryField::Category, "Breaks", 1)]
#[case(CategoryField::Category, "Engine", 4)]
#[case(CategoryField::Region, "East", 0)]
#[case(CategoryField::Region, "West", 3)]
fn test_builtin_codes(#[case] field: CategoryField, #[case] label: &str, #[case] code: u32) {
    let encoder = CategoryEncoder::builtin();
    assert_eq!(encoder.encode(field, label), Some(code));
    assert_eq!(encoder.decode(field, code), Some(label));
}

#[test]
fn test_builtin_table_sizes() {
    let encoder = CategoryEncoder::builtin();
    assert_eq!(encoder.version(), 1);
    assert_eq!(encoder.len(CategoryField::StoreId), 5);
    assert_eq!(encoder.len(CategoryField::ProductName), 20);
    assert_eq!(encoder.len(CategoryField::Category), 5);
    assert_eq!(encoder.len(CategoryField::Region), 4);
}

#[test]
fn test_round_trip_every_label() {
    let encoder = CategoryEncoder::default();
    for field in CategoryField::ALL {
        for (label, code) in encoder.labels(field) {
            assert_eq!(encoder.decode(field, code), Some(label));
            assert_eq!(encoder.encode(field, label), Some(code));
        }
    }
}

#[rstest]
#[case(CategoryField::StoreId, "s001")]
#[case(CategoryField::StoreId, "S006")]
#[case(CategoryField::ProductName, "battery")]
#[case(CategoryField::ProductName, " Battery")]
#[case(CategoryField::Region, "")]
fn test_unknown_labels_are_rejected(#[case] field: CategoryField, #[case] label: &str) {
    let encoder = CategoryEncoder::builtin();
    assert_eq!(encoder.encode(field, label), None);

    match encoder.require(field, label) {
        Err(InsightError::UnknownCategory { field: f, label: l }) => {
            assert_eq!(f, field);
            assert_eq!(l, label);
        }
        other => panic!("Expected UnknownCategory, got {:?}", other),
    }
}

#[test]
fn test_require_code() {
    let encoder = CategoryEncoder::builtin();
    assert!(encoder.require_code(CategoryField::ProductName, 19).is_ok());
    assert!(matches!(
        encoder.require_code(CategoryField::ProductName, 20),
        Err(InsightError::UnknownCategory { .. })
    ));
}

#[test]
fn test_field_names() {
    assert_eq!(CategoryField::StoreId.to_string(), "Store ID");
    assert_eq!(
        "Product Name".parse::<CategoryField>().unwrap(),
        CategoryField::ProductName
    );
    assert!("store id".parse::<CategoryField>().is_err());
}

const ARTIFACT: &str = r#"
version = 2

[fields."Store ID"]
N01 = 0
N02 = 1

[fields."Product Name"]
Gadget = 0

[fields.Category]
Tools = 0

[fields.Region]
Central = 0
"#;

#[test]
fn test_artifact_loading() {
    let encoder = CategoryEncoder::from_toml_str(ARTIFACT).unwrap();
    assert_eq!(encoder.version(), 2);
    assert_eq!(encoder.encode(CategoryField::StoreId, "N02"), Some(1));
    assert_eq!(encoder.decode(CategoryField::Region, 0), Some("Central"));
    assert_eq!(encoder.encode(CategoryField::StoreId, "S001"), None);
}

#[test]
fn test_artifact_from_path() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", ARTIFACT).unwrap();

    let encoder = CategoryEncoder::from_path(file.path()).unwrap();
    assert_eq!(encoder.len(CategoryField::StoreId), 2);
}

#[rstest]
#[case::duplicate_code(ARTIFACT.replace("N02 = 1", "N02 = 0"))]
#[case::missing_field(ARTIFACT.replace("[fields.Region]\nCentral = 0\n", ""))]
#[case::unknown_field(format!("{ARTIFACT}\n[fields.Colour]\nRed = 0\n"))]
#[case::empty_field(ARTIFACT.replace("Gadget = 0", ""))]
#[case::no_version(ARTIFACT.replace("version = 2", ""))]
fn test_invalid_artifacts(#[case] contents: String) {
    let result = CategoryEncoder::from_toml_str(&contents);
    assert!(
        matches!(result, Err(InsightError::ConfigError(_))),
        "Expected ConfigError, got {:?}",
        result
    );
}

#[test]
fn test_from_tables_requires_every_field() {
    let mut tables = BTreeMap::new();
    tables.insert(
        CategoryField::StoreId,
        BTreeMap::from([("S001".to_string(), 0)]),
    );
    assert!(CategoryEncoder::from_tables(1, tables).is_err());
}

#[test]
fn test_unknown_codes_in_dataset() {
    let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let dataset = SalesDataset::from_records(vec![
        SalesRecord::new(date, 0, 2, 3, 0, 10.0),
        SalesRecord::new(date, 9, 2, 3, 0, 10.0),
        SalesRecord::new(date, 1, 25, 3, 7, 10.0),
    ])
    .unwrap();

    let unknown = CategoryEncoder::builtin().unknown_codes(&dataset);

    let mut expected = BTreeMap::new();
    expected.insert(CategoryField::StoreId, BTreeSet::from([9]));
    expected.insert(CategoryField::ProductName, BTreeSet::from([25]));
    expected.insert(CategoryField::Region, BTreeSet::from([7]));
    assert_eq!(unknown, expected);
}
