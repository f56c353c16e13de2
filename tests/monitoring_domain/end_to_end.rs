//! Service status lifecycle: create, look up by index, flip, look up again.

use keyrecord::{Error, Value};

use crate::test_utils::{domain, text, texts};

#[test]
fn status_flip_moves_service_between_index_entries() {
    let d = domain();

    let (mut svc, saved) = d
        .service
        .create(vec![("name", Value::from("svc1")), ("status", Value::Bool(true))])
        .unwrap();
    assert!(saved);

    let up = d.service.find_by("status", "true").unwrap();
    assert_eq!(texts(&up, "name"), vec!["svc1"]);

    svc.set("status", false).unwrap();
    assert!(svc.save().unwrap());

    assert!(d.service.find_by("status", "true").unwrap().is_empty());
    let down = d.service.find_by("status", "false").unwrap();
    assert_eq!(texts(&down, "name"), vec!["svc1"]);
}

#[test]
fn string_status_is_rejected_for_boolean_attribute() {
    let d = domain();
    let (svc, saved) = d
        .service
        .create([("name", "svc1"), ("status", "true")])
        .unwrap();

    assert!(!saved);
    assert!(svc.errors().contains("status"));
    assert_eq!(d.service.count().unwrap(), 0);
}

#[test]
fn reload_matches_saved_service() {
    let d = domain();
    let (svc, _) = d
        .service
        .create(vec![("name", Value::from("svc1")), ("status", Value::Bool(true))])
        .unwrap();

    let loaded = d.service.find_by_id(svc.id().unwrap()).unwrap().unwrap();
    assert_eq!(text(&loaded, "name").as_deref(), Some("svc1"));
    assert_eq!(loaded.get("status").unwrap(), &Value::Bool(true));
    assert_eq!(loaded.attributes(), svc.attributes());
}

#[test]
fn unknown_attribute_kind_fails_at_declaration() {
    let err = keyrecord::EntityType::builder("service")
        .declare("uptime", "float")
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}
