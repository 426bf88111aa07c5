//! Integration tests for hbnb-store.

#![allow(clippy::expect_used)]

use hbnb_store::core::{ClassTag, Record, model};
use hbnb_store::storage::{SnapshotStorage, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_case::test_case;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Snapshot,
    Relational,
}

fn backing_path(kind: Kind, dir: &Path) -> PathBuf {
    match kind {
        Kind::Snapshot => dir.join("file.json"),
        Kind::Relational => dir.join("hbnb.db"),
    }
}

/// Opens a store of the given kind over the files in `dir`, the way a
/// fresh process would.
fn open_store(kind: Kind, dir: &Path) -> Box<dyn Storage> {
    let path = backing_path(kind, dir);
    let mut storage: Box<dyn Storage> = match kind {
        Kind::Snapshot => Box::new(SnapshotStorage::new(path)),
        Kind::Relational => Box::new(SqliteStorage::open(path).expect("open database")),
    };
    storage.reload().expect("reload");
    storage
}

/// Helper to create a test storage instance.
fn create_test_storage(kind: Kind) -> (Box<dyn Storage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = open_store(kind, temp_dir.path());
    (storage, temp_dir)
}

fn state(storage: &mut dyn Storage, name: &str) -> Record {
    let mut record = Record::new(ClassTag::State);
    record.set("name", name);
    model::save(storage, &mut record).expect("save state");
    record
}

fn city(storage: &mut dyn Storage, name: &str, state: &Record) -> Record {
    let mut record = Record::new(ClassTag::City);
    record.set("name", name);
    record.set("state_id", state.id.as_str());
    model::save(storage, &mut record).expect("save city");
    record
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_texas_scenario_survives_restart(kind: Kind) {
    let (mut storage, temp) = create_test_storage(kind);
    let texas = state(storage.as_mut(), "Texas");
    let austin = city(storage.as_mut(), "Texas", &texas);

    let shown = storage
        .get("City", &austin.id)
        .expect("get")
        .expect("city exists")
        .to_string();
    assert!(shown.contains("'name': 'Texas'"));

    storage.close().expect("close");
    drop(storage);

    let restarted = open_store(kind, temp.path());
    let again = restarted
        .get("City", &austin.id)
        .expect("get")
        .expect("city survives restart");
    assert_eq!(again.to_string(), shown);
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_identity_uniqueness(kind: Kind) {
    let (mut storage, _temp) = create_test_storage(kind);
    let mut first = Record::with_id(ClassTag::Amenity, "a1");
    first.set("name", "Wifi");
    let mut second = Record::with_id(ClassTag::Amenity, "a1");
    second.set("name", "Pool");

    storage.new(first);
    storage.new(second);
    assert_eq!(storage.count(Some("Amenity")).expect("count"), 1);

    storage.save().expect("save");
    let all = storage.all(Some("Amenity")).expect("all");
    assert_eq!(all.len(), 1);
    assert_eq!(all["Amenity.a1"].get_str("name"), Some("Pool"));
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_count_matches_all(kind: Kind) {
    let (mut storage, _temp) = create_test_storage(kind);
    let ca = state(storage.as_mut(), "California");
    city(storage.as_mut(), "San Francisco", &ca);
    city(storage.as_mut(), "Oakland", &ca);

    for tag in ClassTag::ALL {
        let class = Some(tag.as_str());
        assert_eq!(
            storage.count(class).expect("count"),
            storage.all(class).expect("all").len()
        );
    }
    assert_eq!(storage.count(None).expect("count"), 3);
    assert_eq!(storage.all(None).expect("all").len(), 3);
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_delete_then_query(kind: Kind) {
    let (mut storage, _temp) = create_test_storage(kind);
    let nevada = state(storage.as_mut(), "Nevada");
    let key = nevada.identity_key();

    model::delete(storage.as_mut(), &nevada).expect("delete");

    assert!(storage.get("State", &nevada.id).expect("get").is_none());
    assert!(!storage.all(None).expect("all").contains_key(&key));
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_unknown_class_is_empty(kind: Kind) {
    let (mut storage, _temp) = create_test_storage(kind);
    state(storage.as_mut(), "Utah");

    assert!(storage.all(Some("Spaceship")).expect("all").is_empty());
    assert_eq!(storage.count(Some("Spaceship")).expect("count"), 0);
    assert!(storage.get("Spaceship", "x").expect("get").is_none());
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_secret_never_displayed(kind: Kind) {
    let (mut storage, temp) = create_test_storage(kind);
    let mut user = Record::new(ClassTag::User);
    user.set("email", "betty@holberton.io");
    user.set("password", "pwd");
    model::save(storage.as_mut(), &mut user).expect("save");
    storage.close().expect("close");
    drop(storage);

    let restarted = open_store(kind, temp.path());
    let loaded = restarted
        .get("User", &user.id)
        .expect("get")
        .expect("user exists");
    assert_eq!(loaded.get_str("_password"), Some("pwd"));
    assert!(!loaded.to_string().contains("pwd"));
    assert!(!loaded.to_dict(false).contains_key("password"));
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_children_lookup(kind: Kind) {
    let (mut storage, _temp) = create_test_storage(kind);
    let ca = state(storage.as_mut(), "California");
    let nv = state(storage.as_mut(), "Nevada");
    city(storage.as_mut(), "San Jose", &ca);
    city(storage.as_mut(), "Reno", &nv);

    let cities = model::cities(storage.as_ref(), &ca).expect("cities");
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].get_str("name"), Some("San Jose"));
}

#[test]
fn test_snapshot_round_trip_preserves_attributes() {
    let (mut storage, temp) = create_test_storage(Kind::Snapshot);
    let mut place = Record::new(ClassTag::Place);
    place.set("name", "Loft");
    place.set("number_rooms", 3);
    place.set("latitude", 37.5);
    place.set("tags", serde_json::json!(["quiet", "central"]));
    model::save(storage.as_mut(), &mut place).expect("save");

    let mut fresh = SnapshotStorage::new(temp.path().join("file.json"));
    fresh.reload().expect("reload");
    let loaded = fresh.get("Place", &place.id).expect("get").expect("place");
    assert_eq!(loaded, place);
}

#[test]
fn test_snapshot_corrupt_file_keeps_index() {
    let (mut storage, temp) = create_test_storage(Kind::Snapshot);
    let utah = state(storage.as_mut(), "Utah");

    std::fs::write(
        temp.path().join("file.json"),
        r#"{"Spaceship.1": {"__class__": "Spaceship", "id": "1"}}"#,
    )
    .expect("write");

    assert!(storage.reload().is_err());
    assert!(storage.get("State", &utah.id).expect("get").is_some());
}

#[test]
fn test_snapshot_failed_save_keeps_previous_file() {
    let temp = TempDir::new().expect("temp dir");
    let data_dir = temp.path().join("data");
    let parked = temp.path().join("data.parked");
    let path = data_dir.join("file.json");

    let mut storage = SnapshotStorage::new(&path);
    storage.reload().expect("reload");
    let utah = state(&mut storage, "Utah");
    let saved = std::fs::read(&path).expect("read saved file");

    // Swap the data directory for a regular file so the next write cannot
    // create its temporary file.
    std::fs::rename(&data_dir, &parked).expect("park data dir");
    std::fs::write(&data_dir, "not a directory").expect("block data dir");

    let mut ohio = Record::new(ClassTag::State);
    ohio.set("name", "Ohio");
    assert!(model::save(&mut storage, &mut ohio).is_err());
    assert!(storage.get("State", &utah.id).expect("get").is_some());
    assert_eq!(storage.count(Some("State")).expect("count"), 2);

    std::fs::remove_file(&data_dir).expect("unblock data dir");
    std::fs::rename(&parked, &data_dir).expect("restore data dir");
    assert_eq!(std::fs::read(&path).expect("read file"), saved);
    let leftovers = std::fs::read_dir(&data_dir).expect("read dir").count();
    assert_eq!(leftovers, 1);

    storage.save().expect("later save succeeds");
    let mut fresh = SnapshotStorage::new(&path);
    fresh.reload().expect("reload");
    assert!(fresh.get("State", &utah.id).expect("get").is_some());
    assert!(fresh.get("State", &ohio.id).expect("get").is_some());
}

#[test_case(Kind::Snapshot ; "snapshot")]
#[test_case(Kind::Relational ; "relational")]
fn test_attribute_order_survives_restart(kind: Kind) {
    let (mut storage, temp) = create_test_storage(kind);
    let mut user = Record::new(ClassTag::User);
    user.set("nickname", "bee");
    user.set("last_name", "Holberton");
    user.set("email", "betty@holberton.io");
    user.set("password", "pwd");
    model::save(storage.as_mut(), &mut user).expect("save");
    storage.close().expect("close");
    drop(storage);

    let restarted = open_store(kind, temp.path());
    let loaded = restarted
        .get("User", &user.id)
        .expect("get")
        .expect("user exists");
    assert_eq!(loaded.to_string(), user.to_string());
}

#[test]
fn test_relational_cascading_delete() {
    let (mut storage, _temp) = create_test_storage(Kind::Relational);
    let ca = state(storage.as_mut(), "California");
    let sf = city(storage.as_mut(), "San Francisco", &ca);

    let mut user = Record::new(ClassTag::User);
    user.set("email", "a@b.c");
    user.set("password", "pwd");
    model::save(storage.as_mut(), &mut user).expect("save user");

    let mut place = Record::new(ClassTag::Place);
    place.set("name", "Loft");
    place.set("city_id", sf.id.as_str());
    place.set("user_id", user.id.as_str());
    model::save(storage.as_mut(), &mut place).expect("save place");

    let mut review = Record::new(ClassTag::Review);
    review.set("text", "Great");
    review.set("place_id", place.id.as_str());
    review.set("user_id", user.id.as_str());
    model::save(storage.as_mut(), &mut review).expect("save review");

    model::delete(storage.as_mut(), &ca).expect("delete state");

    assert!(storage.all(Some("City")).expect("all").is_empty());
    assert!(storage.all(Some("Place")).expect("all").is_empty());
    assert!(storage.all(Some("Review")).expect("all").is_empty());
    assert_eq!(storage.count(Some("User")).expect("count"), 1);
}

#[test]
fn test_relational_reload_idempotent() {
    let (mut storage, _temp) = create_test_storage(Kind::Relational);
    let ca = state(storage.as_mut(), "California");

    storage.reload().expect("first reload");
    storage.reload().expect("second reload");

    assert!(storage.get("State", &ca.id).expect("get").is_some());
}

#[test]
fn test_relational_save_failure_isolation() {
    let (mut storage, _temp) = create_test_storage(Kind::Relational);
    let ca = state(storage.as_mut(), "California");

    let orphan = {
        let mut record = Record::new(ClassTag::City);
        record.set("name", "Nowhere");
        record.set("state_id", "missing-state");
        record
    };
    let mut valid = Record::new(ClassTag::State);
    valid.set("name", "Oregon");
    storage.new(valid.clone());
    storage.new(orphan.clone());

    assert!(storage.save().is_err());
    assert!(storage.get("State", &ca.id).expect("get").is_some());
    assert!(storage.get("State", &valid.id).expect("get").is_none());
    assert!(storage.get("City", &orphan.id).expect("get").is_none());

    let mut next = Record::new(ClassTag::State);
    next.set("name", "Washington");
    storage.new(next.clone());
    storage.save().expect("later save succeeds");
    assert_eq!(storage.count(Some("State")).expect("count"), 2);
}

#[test]
fn test_relational_test_mode_wipes() {
    use hbnb_store::config::{RelationalConfig, StorageConfig};

    let temp = TempDir::new().expect("temp dir");
    let database = temp.path().join("hbnb_test_db").to_string_lossy().into_owned();
    let config = |test_mode| {
        StorageConfig::Relational(RelationalConfig {
            host: "localhost".to_string(),
            port: 3306,
            user: "hbnb_test".to_string(),
            password: "hbnb_test_pwd".to_string(),
            database: database.clone(),
            test_mode,
        })
    };

    let mut storage = hbnb_store::storage::open(&config(false)).expect("open");
    state(storage.as_mut(), "Texas");
    storage.close().expect("close");
    drop(storage);

    let kept = hbnb_store::storage::open(&config(false)).expect("reopen");
    assert_eq!(kept.count(None).expect("count"), 1);
    drop(kept);

    let wiped = hbnb_store::storage::open(&config(true)).expect("reopen in test mode");
    assert_eq!(wiped.count(None).expect("count"), 0);
}

mod property_tests {
    use hbnb_store::core::{ClassTag, Record};
    use hbnb_store::storage::{SnapshotStorage, Storage};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn class_tag() -> impl Strategy<Value = ClassTag> {
        prop::sample::select(ClassTag::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn identity_keys_stay_unique(
            entries in prop::collection::vec((class_tag(), "[a-c]{1,2}", "[a-z ]{0,12}"), 1..30)
        ) {
            let temp = TempDir::new().expect("temp dir");
            let mut storage = SnapshotStorage::new(temp.path().join("file.json"));
            let mut expected = BTreeMap::new();

            for (class, id, name) in entries {
                let mut record = Record::with_id(class, id);
                record.set("name", name.clone());
                expected.insert(record.identity_key(), name);
                storage.new(record);
            }

            let all = storage.all(None).expect("all");
            prop_assert_eq!(all.len(), expected.len());
            for (key, name) in &expected {
                prop_assert_eq!(all[key].get_str("name"), Some(name.as_str()));
            }
            prop_assert_eq!(storage.count(None).expect("count"), all.len());
        }

        #[test]
        fn snapshot_round_trip(
            entries in prop::collection::vec(
                (class_tag(), "[a-z0-9]{1,8}", "[ -~]{0,16}", -1000i64..1000),
                0..20
            )
        ) {
            let temp = TempDir::new().expect("temp dir");
            let path = temp.path().join("file.json");
            let mut storage = SnapshotStorage::new(&path);
            for (class, id, text, number) in entries {
                let mut record = Record::with_id(class, id);
                record.set("text", text);
                record.set("number", number);
                storage.new(record);
            }
            storage.save().expect("save");

            let mut fresh = SnapshotStorage::new(&path);
            fresh.reload().expect("reload");
            prop_assert_eq!(fresh.all(None).expect("all"), storage.all(None).expect("all"));
        }
    }
}
