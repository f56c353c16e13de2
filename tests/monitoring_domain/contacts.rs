//! Contacts owning checks and media through to-many associations.

use std::collections::HashSet;

use keyrecord::{Error, Value};
use serde_json::json;

use crate::test_utils::{domain, texts};

#[test]
fn contact_checks_are_navigable_and_filterable() {
    let d = domain();
    let (ada, _) = d
        .contact
        .create([("first_name", "Ada"), ("email", "ada@example.com")])
        .unwrap();
    let checks = ada.association("checks").unwrap();

    let mut ping = d
        .check
        .build(vec![
            ("name", Value::from("PING")),
            ("state", Value::from("critical")),
            ("enabled", Value::Bool(true)),
        ])
        .unwrap();
    let mut http = d
        .check
        .build(vec![
            ("name", Value::from("HTTP")),
            ("state", Value::from("ok")),
            ("enabled", Value::Bool(true)),
        ])
        .unwrap();
    assert_eq!(checks.add([&mut ping, &mut http]).unwrap(), 2);

    // Critical, but owned by nobody
    d.check
        .create(vec![
            ("name", Value::from("DISK")),
            ("state", Value::from("critical")),
            ("enabled", Value::Bool(true)),
        ])
        .unwrap();

    assert_eq!(texts(&checks.all().unwrap(), "name"), vec!["HTTP", "PING"]);

    let critical = checks.filter([("state", "critical")]).unwrap();
    assert_eq!(texts(&critical.all().unwrap(), "name"), vec!["PING"]);
    assert_eq!(critical.count().unwrap(), 1);

    let enabled_critical = d
        .check
        .filter(vec![("state", Value::from("critical")), ("enabled", Value::Bool(true))])
        .unwrap();
    assert_eq!(enabled_critical.count().unwrap(), 2);

    assert!(d.store.keys().iter().all(|k| !k.contains("::tmp:")));
}

#[test]
fn media_association_rejects_checks() {
    let d = domain();
    let (ada, _) = d.contact.create([("first_name", "Ada")]).unwrap();
    let media = ada.association("media").unwrap();

    let mut check = d.check.build([("name", "PING")]).unwrap();
    let err = media.add([&mut check]).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { ref expected, ref actual }
        if expected == "medium" && actual == "check"));
    assert!(check.id().is_none());
}

#[test]
fn removing_a_medium_keeps_the_record() {
    let d = domain();
    let (ada, _) = d.contact.create([("first_name", "Ada")]).unwrap();
    let media = ada.association("media").unwrap();

    let mut email = d
        .medium
        .build(vec![
            ("transport", Value::from("email")),
            ("address", Value::from("ada@example.com")),
            ("interval", Value::Int(900)),
        ])
        .unwrap();
    media.add([&mut email]).unwrap();
    media.delete([&email]).unwrap();

    assert_eq!(media.count().unwrap(), 0);
    let by_transport = d.medium.find_by("transport", "email").unwrap();
    assert_eq!(by_transport.len(), 1);
}

#[test]
fn contacts_by_tag_subset() {
    let d = domain();
    let tags = |items: &[&str]| {
        Value::Set(items.iter().map(|s| s.to_string()).collect::<HashSet<_>>())
    };
    d.contact
        .create(vec![("first_name", Value::from("Ada")), ("tags", tags(&["ops", "db", "oncall"]))])
        .unwrap();
    d.contact
        .create(vec![("first_name", Value::from("Bob")), ("tags", tags(&["ops", "db"]))])
        .unwrap();
    d.contact
        .create(vec![("first_name", Value::from("Cy")), ("tags", tags(&["web"]))])
        .unwrap();

    let found = d.contact.find_by_set_intersection("tags", &["ops", "db"]).unwrap();
    assert_eq!(texts(&found, "first_name"), vec!["Ada", "Bob"]);

    let found = d
        .contact
        .find_by_set_intersection("tags", &["ops", "db", "oncall"])
        .unwrap();
    assert_eq!(texts(&found, "first_name"), vec!["Ada"]);
}

#[test]
fn preferences_round_trip_as_json() {
    let d = domain();
    let prefs = json!({"quiet_hours": {"from": 22, "to": 7}, "channels": ["sms", "email"]});
    let (ada, saved) = d
        .contact
        .create(vec![("first_name", Value::from("Ada")), ("preferences", Value::Json(prefs.clone()))])
        .unwrap();
    assert!(saved);

    let loaded = d.contact.load(ada.id().unwrap()).unwrap();
    assert_eq!(loaded.get("preferences").unwrap(), &Value::Json(prefs));
}

#[test]
fn destroying_a_check_leaves_contact_reference() {
    let d = domain();
    let (ada, _) = d.contact.create([("first_name", "Ada")]).unwrap();
    let checks = ada.association("checks").unwrap();
    let mut ping = d.check.build([("name", "PING")]).unwrap();
    checks.add([&mut ping]).unwrap();

    ping.destroy().unwrap();

    assert_eq!(checks.count().unwrap(), 1);
    assert_eq!(d.check.count().unwrap(), 0);
}
