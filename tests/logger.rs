use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ctxlog::memory_sink::MemorySink;
use ctxlog::resolved::Resolved;
use ctxlog::{component, f, lazy, with, Context, Field, Level, LogSink, Logger};

fn logger_with_memory() -> (Logger, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (Logger::new([sink.clone() as Arc<dyn LogSink>]), sink)
}

fn names(fields: &[Field]) -> Vec<&str> {
    fields.iter().map(Field::name).collect()
}

#[test]
fn fields_merge_context_then_logger_then_call_site() {
    let (logger, sink) = logger_with_memory();
    let logger = logger.with([f("service", "billing"), f("id", "logger")]);
    let ctx = with(&Context::background(), [f("request_id", "r-1"), f("id", "ctx")]);

    logger.info(&ctx, "charged", [f("id", "call")]);

    let records = sink.records();
    assert_eq!(
        names(records[0].fields()),
        ["request_id", "id", "service", "id", "id"]
    );
    let visible = records[0].visible_fields();
    let last = visible.last().unwrap();
    assert_eq!((last.name.as_str(), &last.value), ("id", &Resolved::Str("call".into())));
}

#[test]
fn nested_component_tags_join() {
    let (logger, sink) = logger_with_memory();
    let ctx = with(&Context::background(), [component("a")]);
    let ctx = with(&ctx, [component("b")]);

    logger.info(&ctx, "tagged", []);

    assert_eq!(sink.records()[0].component(), Some("a.b"));
}

#[test]
fn component_tags_from_every_layer_join_outermost_first() {
    let (logger, sink) = logger_with_memory();
    let logger = logger.with([component("store")]);
    let ctx = with(&Context::background(), [component("http")]);

    logger.debug(&ctx, "tagged", [component("query")]);

    let records = sink.records();
    assert_eq!(records[0].component(), Some("http.store.query"));
    assert_eq!(records[0].fields().len(), 1);
}

#[test]
fn derived_logger_does_not_leak_fields() {
    let (l1, sink) = logger_with_memory();
    let l2 = l1.with([f("x", 1)]);

    l2.info(&Context::background(), "from l2", []);
    l1.info(&Context::background(), "from l1", []);

    let records = sink.records();
    assert_eq!(names(records[0].fields()), ["x"]);
    assert!(records[1].fields().is_empty());
}

#[test]
fn sibling_contexts_are_isolated() {
    let (logger, sink) = logger_with_memory();
    let parent = with(&Context::background(), [f("trace", "t-1")]);
    let left = with(&parent, [f("branch", "left")]);
    let right = with(&parent, [f("branch", "right")]);

    logger.info(&left, "l", []);
    logger.info(&right, "r", []);
    logger.info(&parent, "p", []);

    let records = sink.records();
    assert_eq!(names(records[0].fields()), ["trace", "branch"]);
    assert_eq!(names(records[1].fields()), ["trace", "branch"]);
    assert_eq!(names(records[2].fields()), ["trace"]);
}

#[test]
fn lazy_value_runs_once_across_sinks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let human = Arc::new(ctxlog::human::HumanSink::new(Vec::new(), false));
    let json = Arc::new(ctxlog::json::JsonSink::new(Vec::new()));
    let logger = Logger::new([human.clone() as Arc<dyn LogSink>, json.clone() as Arc<dyn LogSink>]);

    logger.info(
        &Context::background(),
        "computed",
        [lazy("cost", move || counter.fetch_add(1, Ordering::SeqCst) as u64)],
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn lazy_value_is_not_evaluated_without_rendering() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (logger, sink) = logger_with_memory();

    logger.info(
        &Context::background(),
        "deferred",
        [lazy("cost", move || counter.fetch_add(1, Ordering::SeqCst) as u64)],
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    sink.records()[0].resolved();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn shared_logger_across_threads() {
    let (logger, sink) = logger_with_memory();
    let base = logger.with([f("base", true)]);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let base = base.clone();
            thread::spawn(move || {
                let worker = base.with([f("worker", i)]);
                let ctx = with(&Context::background(), [f("task", i)]);
                worker.log(&ctx, Level::Info, "working", []);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let records = sink.records();
    assert_eq!(records.len(), 8);
    for record in &records {
        assert_eq!(names(record.fields()), ["task", "base", "worker"]);
    }
    assert_eq!(names(base.fields().iter().cloned().collect::<Vec<_>>().as_slice()), ["base"]);
}

#[test]
fn message_is_kept_literally() {
    let (logger, sink) = logger_with_memory();
    logger.warn(&Context::background(), "  spaced {braces} %d\n", []);
    assert_eq!(sink.records()[0].message(), "  spaced {braces} %d\n");
}
