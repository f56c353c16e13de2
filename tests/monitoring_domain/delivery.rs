//! Notification queue drained by a delivery worker.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyrecord::{DeliveryOutcome, KeyrecordConfig, Store, WorkQueue};
use serde_json::json;

use crate::test_utils::init_tracing;

#[test]
fn worker_drains_queue_and_counts_outcomes() {
    init_tracing();
    let config = KeyrecordConfig::from_toml_str("namespace = \"flap\"\npop_timeout_ms = 100").unwrap();
    let store: Arc<dyn Store> = Arc::new(keyrecord::MemoryStore::new());
    let queue = WorkQueue::from_config(Arc::clone(&store), &config, "pushover_notifications");

    let worker = {
        let queue = queue.clone();
        thread::spawn(move || {
            let mut handled = 0;
            while let Some(item) = queue.next_default().unwrap() {
                let alert: serde_json::Value = serde_json::from_str(&item).unwrap();
                if alert["notification_type"] == "shutdown" {
                    break;
                }
                let outcome = if alert["address"].as_str().map(str::is_empty).unwrap_or(true) {
                    DeliveryOutcome::Failed
                } else {
                    DeliveryOutcome::Delivered
                };
                queue.record_outcome(outcome).unwrap();
                handled += 1;
            }
            handled
        })
    };

    for address in ["ops", "", "db"] {
        let alert = json!({"notification_type": "problem", "state": "critical", "address": address});
        queue.push(alert.to_string()).unwrap();
    }
    queue
        .push(json!({"notification_type": "shutdown"}).to_string())
        .unwrap();

    assert_eq!(worker.join().unwrap(), 3);
    assert_eq!(queue.outcome_count(DeliveryOutcome::Delivered).unwrap(), 2);
    assert_eq!(queue.outcome_count(DeliveryOutcome::Failed).unwrap(), 1);
    assert!(queue.pending().unwrap().is_empty());
    assert!(store.exists("flap:pushover_notifications:outcomes").unwrap());
}

#[test]
fn idle_worker_times_out() {
    init_tracing();
    let store: Arc<dyn Store> = Arc::new(keyrecord::MemoryStore::new());
    let queue = WorkQueue::new(store, &keyrecord::Keyspace::new(), "email_notifications");
    assert!(queue.next(Duration::from_millis(20)).unwrap().is_none());
}
