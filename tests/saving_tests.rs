use serde_json::json;
use sheetview::{Cell, Dataset, DatasetStore, FileStore, MemoryStore, Row};
use tempfile::TempDir;
use uuid::Uuid;

fn sample_dataset() -> Dataset {
    Dataset::new(
        "sales.xlsx",
        vec!["Region".to_string(), "Amount".to_string(), "Note".to_string()],
        vec![
            Row::new(vec![
                Some(Cell::Text("North".into())),
                Some(Cell::Number(1234.0)),
                None,
            ]),
            Row::new(vec![
                Some(Cell::Text("South".into())),
                Some(Cell::Text("1,000".into())),
                Some(Cell::Text("late".into())),
            ]),
        ],
    )
}

#[test]
fn file_store_round_trips_records() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let saved = store.insert(sample_dataset()).unwrap();
    let loaded = store.get(&saved.id).unwrap().expect("record should exist");

    assert_eq!(loaded, saved);
    assert_eq!(loaded.dataset, sample_dataset());
}

#[test]
fn file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(sample_dataset()).unwrap().id
    };

    let reopened = FileStore::open(dir.path()).unwrap();
    let loaded = reopened.get(&id).unwrap().expect("record should exist");
    assert_eq!(loaded.dataset.file_name(), "sales.xlsx");
    assert_eq!(loaded.dataset.len(), 2);
}

#[test]
fn each_insert_gets_a_fresh_id() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let first = store.insert(sample_dataset()).unwrap();
    let second = store.insert(sample_dataset()).unwrap();

    assert_ne!(first.id, second.id);
    assert!(store.get(&first.id).unwrap().is_some());
    assert!(store.get(&second.id).unwrap().is_some());
}

#[test]
fn unknown_and_malformed_ids_are_absent() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.insert(sample_dataset()).unwrap();

    assert!(store.get("00000000000000000000000000000000").unwrap().is_none());
    assert!(store.get("not-an-id").unwrap().is_none());
    assert!(store.get("../../etc/passwd").unwrap().is_none());
    assert!(store.get("").unwrap().is_none());
}

#[test]
fn record_serializes_to_document_shape() {
    let store = MemoryStore::new();
    let saved = store.insert(sample_dataset()).unwrap();

    let document = serde_json::to_value(&saved).unwrap();

    assert_eq!(document["_id"], json!(saved.id));
    assert_eq!(document["fileName"], json!("sales.xlsx"));
    assert_eq!(document["headers"], json!(["Region", "Amount", "Note"]));
    assert_eq!(
        document["data"],
        json!([
            { "Region": "North", "Amount": 1234 },
            { "Region": "South", "Amount": "1,000", "Note": "late" }
        ])
    );
    assert!(document["createdAt"].is_string());
}

#[test]
fn memory_store_finds_only_inserted_records() {
    let store = MemoryStore::new();
    let saved = store.insert(sample_dataset()).unwrap();

    assert_eq!(store.get(&saved.id).unwrap(), Some(saved));
    assert!(store.get("missing").unwrap().is_none());
}

#[test]
fn stores_agree_on_id_spelling() {
    let dir = TempDir::new().unwrap();
    let file_store = FileStore::open(dir.path()).unwrap();
    let memory_store = MemoryStore::new();
    let stores: [&dyn DatasetStore; 2] = [&file_store, &memory_store];

    for store in stores {
        let saved = store.insert(sample_dataset()).unwrap();
        let uuid = Uuid::parse_str(&saved.id).unwrap();

        for spelling in [
            saved.id.clone(),
            uuid.hyphenated().to_string(),
            uuid.simple().to_string().to_uppercase(),
        ] {
            let found = store.get(&spelling).unwrap().expect("record should exist");
            assert_eq!(found.id, saved.id);
        }
        assert!(store.get("not-an-id").unwrap().is_none());
    }
}
