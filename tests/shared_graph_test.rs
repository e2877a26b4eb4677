//! Integration tests for the thread-safe graph handle

mod common;

use badge_graph::{global, BadgeSpec, Diagnostic, GraphConfig, Observer, SharedBadgeGraph};
use common::{counter, MENU_CONFIG};
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use test_log::test;

#[test]
fn test_observer_can_reenter_the_handle() {
    let graph = SharedBadgeGraph::new();
    let (mail, checker) = counter(1);
    graph.register("menu", None).unwrap();
    graph
        .register_with(BadgeSpec::new("mail").checker(checker).parent("menu"))
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = graph.clone();
    let log = seen.clone();
    let slot: Arc<Mutex<Option<Observer>>> = Arc::default();
    let this = slot.clone();
    let observer = Observer::new(move |key, value| {
        // Reads and unbinds through the same handle while being notified.
        log.lock().push((value, handle.get_value("mail")));
        if let Some(me) = this.lock().as_ref() {
            handle.unbind(key, me);
        }
    });
    *slot.lock() = Some(observer.clone());
    graph.bind("menu", observer, false);

    graph.refresh("mail");
    mail.store(3, Ordering::SeqCst);
    graph.refresh("mail");

    assert_eq!(*seen.lock(), vec![(1, 1)], "observer unbound itself after one call");
    assert_eq!(graph.get_value("menu"), 3);
}

#[test]
fn test_observer_can_refresh_another_badge() {
    let graph = SharedBadgeGraph::new();
    let (_, mail) = counter(2);
    let (_, digest) = counter(9);
    graph.register("mail", Some(mail)).unwrap();
    graph.register("digest", Some(digest)).unwrap();

    let handle = graph.clone();
    graph.bind(
        "mail",
        Observer::new(move |_, _| {
            handle.refresh("digest");
        }),
        false,
    );
    graph.refresh("mail");
    assert_eq!(graph.get_value("digest"), 9);
}

#[test]
fn test_nested_refresh_is_delivered_after_the_outer_one() {
    let graph = SharedBadgeGraph::new();
    let (_, mail) = counter(1);
    let (_, tasks) = counter(2);
    graph.register("menu", None).unwrap();
    graph
        .register_with(BadgeSpec::new("mail").checker(mail).parent("menu"))
        .unwrap();
    graph
        .register_with(BadgeSpec::new("tasks").checker(tasks).parent("menu"))
        .unwrap();

    let handle = graph.clone();
    graph.bind(
        "mail",
        Observer::new(move |_, _| {
            handle.refresh("tasks");
        }),
        false,
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    graph.bind(
        "menu",
        Observer::count(move |count| log.lock().push(count)),
        false,
    );

    graph.refresh("mail");
    assert_eq!(graph.get_value("menu"), 3);
    assert_eq!(*seen.lock(), vec![1, 3]);
    assert_eq!(seen.lock().last().copied(), Some(graph.get_value("menu")));
}

#[test]
fn test_concurrent_refreshes_end_on_the_stored_value() {
    let graph = SharedBadgeGraph::new();
    graph.register("total", None).unwrap();
    let last = Arc::new(Mutex::new(None));
    let slot = last.clone();
    graph.bind(
        "total",
        Observer::count(move |count| *slot.lock() = Some(count)),
        false,
    );

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let graph = graph.clone();
            thread::spawn(move || {
                let key = format!("leaf{i}");
                graph
                    .register_with(BadgeSpec::new(&key).parent("total"))
                    .unwrap();
                for count in 1..=20 {
                    graph.set_value(&key, count).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(graph.get_value("total"), 160);
    assert_eq!(*last.lock(), Some(160));
}

#[test]
fn test_concurrent_refreshes_accumulate_exactly() {
    let graph = SharedBadgeGraph::new();
    graph.register("total", None).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let graph = graph.clone();
            thread::spawn(move || {
                let key = format!("leaf{i}");
                let (_, checker) = counter(i + 1);
                graph
                    .register_with(BadgeSpec::new(&key).checker(checker).parent("total"))
                    .unwrap();
                graph.refresh(&key);
                graph.refresh(&key);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(graph.get_value("total"), (1..=8).sum::<i64>() as u64);
}

#[test]
fn test_failing_observer_is_recorded() {
    let graph = SharedBadgeGraph::new();
    graph.register("menu", None).unwrap();
    graph.bind("menu", Observer::new(|_, _| panic!("stale widget")), false);
    graph.set_value("menu", 1).unwrap();
    assert!(matches!(
        graph.take_diagnostics().as_slice(),
        [Diagnostic::ObserverFailed { key, .. }] if key == "menu"
    ));
}

#[test]
fn test_unregister_through_handle() {
    let graph = SharedBadgeGraph::from_config(&GraphConfig::from_toml_str(MENU_CONFIG).unwrap())
        .unwrap();
    graph.set_value("mail", 4).unwrap();
    assert_eq!(graph.get_value("hud"), 4);

    let notified = Arc::new(AtomicUsize::new(0));
    let count = notified.clone();
    graph.bind(
        "hud",
        Observer::count(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }),
        false,
    );

    let outcome = graph.unregister("mail", true).unwrap();
    assert_eq!(outcome.delta, -4);
    assert_eq!(graph.get_value("hud"), 0);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert!(!graph.contains("mail"));
}

#[test]
fn test_global_instance_is_shared() {
    let key = "shared_graph_test::global_badge";
    global().register(key, None).unwrap();
    global().set_value(key, 2).unwrap();

    let reader = thread::spawn(move || global().get_value(key));
    assert_eq!(reader.join().unwrap(), 2);
    assert!(global().has_value(key));

    global().unregister(key, true);
    assert!(!global().contains(key));
}
