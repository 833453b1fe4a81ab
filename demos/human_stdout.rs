use std::sync::Arc;

use ctxlog::error_chain::{located, wrap};
use ctxlog::human::HumanSink;
use ctxlog::json::JsonSink;
use ctxlog::{component, error, f, lazy, map, Context, HumanConfig, LogSink, Logger};

fn main() {
    let config = HumanConfig::from_env().unwrap_or_default();
    let logger = Logger::new([
        Arc::new(HumanSink::stdout(config)) as Arc<dyn LogSink>,
        Arc::new(JsonSink::stdout()) as Arc<dyn LogSink>,
    ])
    .with([f("service", "demo")]);

    let ctx = ctxlog::with(&Context::background(), [f("request_id", "r-17"), component("api")]);
    logger.info(&ctx, "request served", [f("status", 200), f("elapsed", std::time::Duration::from_millis(12))]);

    let ctx = ctx.with([component("auth")]);
    let err = wrap(located("connection refused"), "loading session");
    logger.error(
        &ctx,
        "login failed",
        [
            map("user", [f("id", 42), f("name", "ann")]),
            lazy("queue_depth", || 17),
            error(err),
        ],
    );

    logger.warn(&ctx, "multi\nline message", [f("note", "first\nsecond")]);

    if let Err(err) = logger.sync() {
        eprintln!("failed to flush logs: {err}");
    }
}
