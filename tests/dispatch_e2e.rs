use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use kyrohook::{
    BindOptions, BindingType, DispatchError, Dispatcher, Handler, HookError, NamedHandlers,
    ResolvingInvoker, TriggerOutcome, DEFAULT_PRIORITY,
};

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn recorder(log: &Log, label: &str) -> Handler {
    let log = Arc::clone(log);
    let label = label.to_string();
    Handler::callable(move |_, _| {
        log.lock().unwrap().push(label.clone());
        None
    })
}

fn returning(log: &Log, label: &str, value: Option<&str>) -> Handler {
    let log = Arc::clone(log);
    let label = label.to_string();
    let value = value.map(Value::from);
    Handler::callable(move |_, _| {
        log.lock().unwrap().push(label.clone());
        value.clone()
    })
}

fn taken(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[test]
fn priority_order_end_to_end() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();

    hooks
        .bind(
            "foo",
            recorder(&log, "first-100"),
            BindOptions::new().priority(100),
            BindingType::When,
        )
        .unwrap();
    hooks
        .bind("foo", recorder(&log, "102"), BindOptions::new().priority(102), BindingType::When)
        .unwrap();
    hooks
        .bind(
            "foo",
            recorder(&log, "second-100"),
            BindOptions::new().priority(100),
            BindingType::When,
        )
        .unwrap();

    let outcome = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(outcome.report().map(|r| r.invoked), Some(3));
    assert_eq!(taken(&log), vec!["102", "first-100", "second-100"]);
}

#[test]
fn later_equal_priority_handler_runs_last() {
    let foo = Arc::new(Mutex::new(String::new()));

    let hooks = Dispatcher::default();
    for value in ["foo", "bar"] {
        let foo = Arc::clone(&foo);
        hooks
            .bind(
                "foo",
                Handler::callable(move |_, _| {
                    *foo.lock().unwrap() = value.to_string();
                    None
                }),
                BindOptions::new(),
                BindingType::When,
            )
            .unwrap();
    }
    let _ = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(*foo.lock().unwrap(), "bar");

    let hooks = Dispatcher::default();
    for (value, priority) in [("foo", DEFAULT_PRIORITY), ("bar", DEFAULT_PRIORITY + 2)] {
        let foo = Arc::clone(&foo);
        hooks
            .bind(
                "foo",
                Handler::callable(move |_, _| {
                    *foo.lock().unwrap() = value.to_string();
                    None
                }),
                BindOptions::new().priority(priority),
                BindingType::When,
            )
            .unwrap();
    }
    let _ = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(*foo.lock().unwrap(), "foo");
}

#[test]
fn handler_sees_event_fields_and_data() {
    let hooks = Dispatcher::default();
    let called = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&called);

    hooks
        .on(
            "reg/*",
            Handler::callable(move |e, data| {
                c.fetch_add(1, Ordering::SeqCst);
                assert_eq!(e.name(), "reg/*");
                assert_eq!(e.bag_value("a"), Some(&json!("a")));
                assert_eq!(e.bag_value("b"), Some(&json!("b2")));
                assert_eq!(e.priority(), DEFAULT_PRIORITY);
                assert_eq!(e.binding_type(), BindingType::On);
                assert_eq!(e.trigger(), "reg/foo");
                assert_eq!(data["test"], json!("___"));
                None
            }),
            BindOptions::new().bag_entry("a", "a").bag_entry("b", "b2"),
        )
        .unwrap();

    let outcome = hooks
        .trigger("reg/foo", json!({ "test": "___" }), BindingType::On)
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.triggered(BindingType::On).unwrap().get("reg/*"), Some(&1));
}

#[test]
fn named_handler_without_resolver_fails_the_round() {
    init_tracing();
    let hooks = Dispatcher::default();
    hooks.bind("foo", "foo", BindOptions::new(), BindingType::When).unwrap();

    let err = hooks.trigger("foo", Value::Null, BindingType::When).unwrap_err();
    assert!(matches!(
        err,
        HookError::Dispatch(DispatchError::HandlerNotInvocable { .. })
    ));
    assert!(err.is_fatal());
}

#[test]
fn named_handlers_resolve_through_invoker() {
    let table = Arc::new(NamedHandlers::new());
    let log: Log = Log::default();
    let l = Arc::clone(&log);
    table
        .insert("audit", move |e, _| {
            l.lock().unwrap().push(e.trigger().to_string());
            None
        })
        .unwrap();

    let hooks = Dispatcher::default();
    hooks.before("save/*", "audit", BindOptions::new()).unwrap();
    assert!(hooks.trigger("save/user", Value::Null, BindingType::Before).is_err());

    hooks
        .set_invoker(Arc::new(ResolvingInvoker::new(Arc::clone(&table))))
        .unwrap();
    assert!(hooks
        .trigger("save/user", Value::Null, BindingType::Before)
        .unwrap()
        .is_completed());
    assert_eq!(taken(&log), vec!["save/user"]);

    // Unbinding by name matches the stored reference.
    assert_eq!(
        hooks
            .off_handler("save/*", &Handler::named("audit"), BindingType::Before)
            .unwrap(),
        1
    );
}

#[test]
fn abnormal_return_suspends_round() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    hooks
        .bind("foo", returning(&log, "foo", None), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("bar", returning(&log, "bar", Some("bar")), BindOptions::new(), BindingType::When)
        .unwrap();

    assert!(hooks
        .trigger("foo", Value::Null, BindingType::When)
        .unwrap()
        .is_completed());

    let interrupt = hooks
        .trigger("bar", Value::Null, BindingType::When)
        .unwrap()
        .into_interrupt()
        .expect("abnormal return should suspend");
    assert_eq!(interrupt.receive(), &json!("bar"));
    assert_eq!(taken(&log), vec!["foo", "bar"]);
}

#[test]
fn suspension_and_resumption_protocol() {
    init_tracing();
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    hooks
        .bind("foo", returning(&log, "foo", None), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("foo", returning(&log, "bar", Some("bar")), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("foo", returning(&log, "biz", Some("biz")), BindOptions::new(), BindingType::When)
        .unwrap();

    // Abandoned suspension: nothing is counted.
    let interrupt = hooks
        .trigger("foo", json!("data"), BindingType::When)
        .unwrap()
        .into_interrupt()
        .unwrap();
    assert_eq!(interrupt.receive(), &json!("bar"));
    assert_eq!(interrupt.data(), &json!("data"));
    assert_eq!(interrupt.step(), 1);
    assert_eq!(interrupt.events().len(), 3);
    assert_eq!(interrupt.event().unwrap().name(), "foo");
    assert_eq!(interrupt.binding_type(), BindingType::When);
    drop(interrupt);
    assert!(hooks.triggered(BindingType::When).unwrap().is_empty());
    assert_eq!(taken(&log), vec!["foo", "bar"]);

    // resume(false) stops at the next abnormal return.
    let interrupt = hooks
        .trigger("foo", json!("data"), BindingType::When)
        .unwrap()
        .into_interrupt()
        .unwrap();
    let next = interrupt.resume(false).unwrap().into_interrupt().unwrap();
    assert_eq!(next.step(), 2);
    assert_eq!(next.receive(), &json!("biz"));
    assert_eq!(next.events().len(), 3);
    assert!(hooks.triggered(BindingType::When).unwrap().is_empty());
    drop(next);
    assert_eq!(taken(&log), vec!["foo", "bar", "biz"]);

    // resume(true) runs to the end and counts the round once.
    let interrupt = hooks
        .trigger("foo", json!("data"), BindingType::When)
        .unwrap()
        .into_interrupt()
        .unwrap();
    let outcome = interrupt.resume(true).unwrap();
    assert_eq!(outcome.report().map(|r| r.invoked), Some(3));
    assert_eq!(taken(&log), vec!["foo", "bar", "biz"]);

    let stats = hooks.triggered(BindingType::When).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats.get("foo"), Some(&1));
}

#[test]
fn suspension_at_first_step() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    hooks
        .bind("foo", returning(&log, "a", Some("a")), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("foo", returning(&log, "b", Some("b")), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("foo", returning(&log, "c", None), BindOptions::new(), BindingType::When)
        .unwrap();

    let first = hooks
        .trigger("foo", Value::Null, BindingType::When)
        .unwrap()
        .into_interrupt()
        .unwrap();
    assert_eq!(first.step(), 0);
    assert_eq!(first.receive(), &json!("a"));

    let second = first.resume(false).unwrap().into_interrupt().unwrap();
    assert_eq!(second.step(), 1);
    assert_eq!(second.receive(), &json!("b"));

    let done = second.resume(true).unwrap();
    assert!(done.is_completed());
    assert_eq!(taken(&log), vec!["a", "b", "c"]);
    assert_eq!(hooks.triggered(BindingType::When).unwrap().get("foo"), Some(&1));
}

#[test]
fn multiple_patterns_count_per_round() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    hooks
        .bind("foo/*", recorder(&log, "foo"), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("foo/baz", recorder(&log, "bar"), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("bar/*", recorder(&log, "foo2"), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("bar/baz", recorder(&log, "bar2"), BindOptions::new(), BindingType::When)
        .unwrap();

    for name in ["foo/baz", "bar/baz", "foo/que", "foo/baz", "bar/que"] {
        assert!(hooks
            .trigger(name, Value::Null, BindingType::When)
            .unwrap()
            .is_completed());
    }
    assert_eq!(
        taken(&log),
        vec!["foo", "bar", "foo2", "bar2", "foo", "foo", "bar", "foo2"]
    );

    let stats = hooks.triggered(BindingType::When).unwrap();
    assert_eq!(stats.get("foo/*"), Some(&3));
    assert_eq!(stats.get("foo/baz"), Some(&2));
    assert_eq!(stats.get("bar/*"), Some(&2));
    assert_eq!(stats.get("bar/baz"), Some(&1));
}

#[test]
fn repeated_pattern_counts_once_per_round() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    for label in ["a", "b", "c"] {
        hooks
            .bind("grp@x/*", recorder(&log, label), BindOptions::new(), BindingType::After)
            .unwrap();
    }
    let _ = hooks.trigger("grp@x/1", Value::Null, BindingType::After).unwrap();
    assert_eq!(hooks.triggered(BindingType::After).unwrap().get("grp@x/*"), Some(&1));
}

#[test]
fn off_inside_handler_unbinds_after_round() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    hooks
        .bind("foo", recorder(&log, "foo"), BindOptions::new(), BindingType::When)
        .unwrap();
    let l = Arc::clone(&log);
    hooks
        .bind(
            "foo",
            Handler::callable(move |e, _| {
                l.lock().unwrap().push("bar".to_string());
                e.off();
                None
            }),
            BindOptions::new(),
            BindingType::When,
        )
        .unwrap();
    hooks
        .bind("foo", recorder(&log, "biz"), BindOptions::new(), BindingType::When)
        .unwrap();

    let _ = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(taken(&log), vec!["foo", "bar", "biz"]);
    assert_eq!(hooks.queue("foo", BindingType::When).unwrap().len(), 2);

    let _ = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(taken(&log), vec!["foo", "biz"]);
    assert_eq!(hooks.binding_count().unwrap(), 2);
}

#[test]
fn stop_propagation_is_scoped_to_the_round() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();

    for (label, stop_on) in [("foo", Some("reg/foo")), ("bar", Some("reg/bar")), ("biz", None)] {
        let l = Arc::clone(&log);
        hooks
            .bind(
                "reg/*",
                Handler::callable(move |e, _| {
                    if stop_on == Some(e.trigger()) {
                        e.stop_propagation();
                    }
                    l.lock().unwrap().push(label.to_string());
                    None
                }),
                BindOptions::new(),
                BindingType::When,
            )
            .unwrap();
    }

    let outcome = hooks.trigger("reg/foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(outcome.report().and_then(|r| r.stopped_at), Some(0));
    assert_eq!(taken(&log), vec!["foo"]);

    let _ = hooks.trigger("reg/bar", Value::Null, BindingType::When).unwrap();
    assert_eq!(taken(&log), vec!["foo", "bar"]);

    let _ = hooks.trigger("reg/biz", Value::Null, BindingType::When).unwrap();
    assert_eq!(taken(&log), vec!["foo", "bar", "biz"]);

    let _ = hooks.trigger("reg/other", Value::Null, BindingType::When).unwrap();
    assert_eq!(taken(&log), vec!["foo", "bar", "biz"]);

    let outcome = hooks.trigger("none", Value::Null, BindingType::When).unwrap();
    assert_eq!(outcome.report().map(|r| r.invoked), Some(0));
    assert!(taken(&log).is_empty());

    // Stopped rounds still count.
    assert_eq!(hooks.triggered(BindingType::When).unwrap().get("reg/*"), Some(&4));
}

#[test]
fn ignored_abnormal_returns_still_honor_stop() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    let l = Arc::clone(&log);
    hooks
        .bind(
            "foo",
            Handler::callable(move |e, _| {
                l.lock().unwrap().push("stopper".to_string());
                e.stop_propagation();
                Some(json!("x"))
            }),
            BindOptions::new().priority(200),
            BindingType::When,
        )
        .unwrap();
    hooks
        .bind("foo", recorder(&log, "after"), BindOptions::new(), BindingType::When)
        .unwrap();

    let events = hooks.queue("foo", BindingType::When).unwrap();
    let outcome = hooks
        .trigger_events(events, Value::Null, BindingType::When, 0, false)
        .unwrap();
    assert_eq!(outcome.report().and_then(|r| r.stopped_at), Some(0));
    assert_eq!(taken(&log), vec!["stopper"]);
}

#[test]
fn bag_edits_stay_on_the_event() {
    let hooks = Dispatcher::default();
    let seen: Log = Log::default();
    let s = Arc::clone(&seen);
    hooks
        .bind(
            "foo",
            Handler::callable(move |e, _| {
                s.lock().unwrap().push(e.bag_value_or("n", json!("unset")).to_string());
                e.set_bag("n", "edited");
                None
            }),
            BindOptions::new().bag_entry("n", "default"),
            BindingType::When,
        )
        .unwrap();

    let _ = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    let _ = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(taken(&seen), vec!["\"default\"", "\"default\""]);
}

#[test]
fn nested_trigger_has_its_own_round() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    let weak = hooks.downgrade();

    let l = Arc::clone(&log);
    hooks
        .bind(
            "outer",
            Handler::callable(move |_, data| {
                l.lock().unwrap().push("outer".to_string());
                let hooks = weak.upgrade()?;
                let inner = hooks.trigger("inner", data.clone(), BindingType::When).ok()?;
                assert!(inner.is_completed());
                None
            }),
            BindOptions::new(),
            BindingType::When,
        )
        .unwrap();
    hooks
        .bind("inner", recorder(&log, "inner"), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("outer", recorder(&log, "outer-2"), BindOptions::new(), BindingType::When)
        .unwrap();

    let outcome = hooks.trigger("outer", Value::Null, BindingType::When).unwrap();
    assert_eq!(outcome.report().map(|r| r.invoked), Some(2));
    assert_eq!(taken(&log), vec!["outer", "inner", "outer-2"]);

    let stats = hooks.triggered(BindingType::When).unwrap();
    assert_eq!(stats.get("outer"), Some(&1));
    assert_eq!(stats.get("inner"), Some(&1));
}

#[test]
fn interrupt_resume_after_unbind_keeps_in_flight_sequence() {
    let hooks = Dispatcher::default();
    let log: Log = Log::default();
    hooks
        .bind("foo", returning(&log, "a", Some("stop")), BindOptions::new(), BindingType::When)
        .unwrap();
    hooks
        .bind("foo", recorder(&log, "b"), BindOptions::new(), BindingType::When)
        .unwrap();

    let interrupt = hooks
        .trigger("foo", Value::Null, BindingType::When)
        .unwrap()
        .into_interrupt()
        .unwrap();
    assert_eq!(hooks.off("foo", BindingType::When).unwrap(), 2);

    let outcome = interrupt.resume(false).unwrap();
    assert!(matches!(outcome, TriggerOutcome::Completed(_)));
    assert_eq!(taken(&log), vec!["a", "b"]);
    assert!(hooks.queue("foo", BindingType::When).unwrap().is_empty());
}

#[test]
fn uncompilable_wildcard_is_rejected_at_bind() {
    init_tracing();
    let hooks = Dispatcher::default();
    hooks
        .bind("foo", Handler::callable(|_, _| None), BindOptions::new(), BindingType::When)
        .unwrap();

    let err = hooks
        .bind(
            &"a*".repeat(200_000),
            Handler::callable(|_, _| None),
            BindOptions::new(),
            BindingType::When,
        )
        .unwrap_err();
    assert!(err.is_pattern());
    assert_eq!(hooks.binding_count().unwrap(), 1);

    let outcome = hooks.trigger("foo", Value::Null, BindingType::When).unwrap();
    assert_eq!(outcome.report().map(|r| r.invoked), Some(1));
    assert_eq!(hooks.triggered(BindingType::When).unwrap().get("foo"), Some(&1));
}
