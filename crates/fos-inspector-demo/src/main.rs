//! fOS Inspector Demo - scripted session
//!
//! Attaches the inspector to a legacy host, drives a few renders, edits and
//! unmounts, and logs every batch the inspector emits.
//!
//! Usage: `fos-inspector-demo [config.json]`

use std::rc::Rc;

use anyhow::Context;
use fos_inspector::operations::decode_batch;
use fos_inspector::{
    DevtoolsHook, HookEvent, HostRenderer, Inspector, InspectorConfig, LocalExecutorScheduler,
    PathKey, Value,
};
use fos_legacy_host::{Element, Generation, InstanceId, LegacyHost};
use smol::LocalExecutor;
use tracing_subscriber::EnvFilter;

/// Hook that decodes and logs every batch
struct LoggingHook;

impl DevtoolsHook for LoggingHook {
    fn emit(&self, event: HookEvent) {
        let name = event.name();
        let HookEvent::Operations(words) = event;
        match decode_batch(&words) {
            Ok(batch) => {
                tracing::info!(
                    "{} for root {} ({} words, {} operation(s))",
                    name,
                    batch.root_id,
                    words.len(),
                    batch.operations.len()
                );
                for op in &batch.operations {
                    tracing::info!("  {:?}", op);
                }
            }
            Err(err) => tracing::error!("Undecodable batch {:?}: {}", words, err),
        }
    }
}

fn load_config() -> anyhow::Result<InspectorConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(InspectorConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path))
}

/// Run the executor until every scheduled flush has fired
fn settle(executor: &LocalExecutor<'static>, scheduler: &LocalExecutorScheduler) {
    smol::block_on(executor.run(async {
        while scheduler.pending() > 0 {
            smol::future::yield_now().await;
        }
    }));
}

fn first_child(host: &LegacyHost, node: InstanceId) -> anyhow::Result<InstanceId> {
    host.children(&node)
        .first()
        .copied()
        .with_context(|| format!("{} has no children", node))
}

fn app() -> Element {
    Element::host("div").child(
        Element::class("App").source("demo/app.rs", 3, 1).child(
            Element::host("main").children([
                Element::class("Counter")
                    .key("counter")
                    .prop("step", 1)
                    .state(Value::from_pairs([("count", Value::from(0))]))
                    .child(Element::host("button").child(Element::text("+"))),
                Element::function("Footer").child(Element::host("small").child(Element::text("fOS"))),
            ]),
        ),
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    tracing::info!("fOS Inspector {} demo", fos_inspector::VERSION);

    let executor = Rc::new(LocalExecutor::new());
    let scheduler = Rc::new(LocalExecutorScheduler::new(executor.clone()));
    let host = LegacyHost::new(Generation::LegacyDom);
    let inspector = Inspector::attach(host.clone(), Rc::new(LoggingHook), scheduler.clone(), config)?;

    // Initial render flushes synchronously.
    let root = host.render(app(), "root")?;
    let app_node = first_child(&host, root)?;
    let main = first_child(&host, app_node)?;
    let counter = first_child(&host, main)?;

    // Three mutations, one batch.
    let row = host.mount_child(main, Element::class("Row").key("r1"))?;
    host.mount_child(row, Element::class("Cell"))?;
    host.update(app_node)?;
    settle(&executor, &scheduler);

    // Inspect and edit the counter.
    let counter_id = inspector.id_of(&counter).context("counter is not registered")?;
    if let Some(element) = inspector.inspect_element(counter_id) {
        tracing::info!("Inspected {}: {}", element, element.to_json()?);
    }
    inspector.select_element(counter_id);
    inspector.log_element_to_console(counter_id);
    inspector.set_in_state(counter_id, &[PathKey::from("count")], Value::from(41));
    settle(&executor, &scheduler);

    if let Some(native) = inspector.get_native_from_internal(counter_id) {
        tracing::info!(
            "Counter renders native {:?}, which maps back to {:?}",
            native,
            inspector.get_internal_id_from_native(&native)
        );
    }
    if let Some(app_id) = inspector.id_of(&app_node) {
        tracing::info!("App source: {:?}", inspector.prepare_view_element_source(app_id));
    }

    // Mounted and unmounted in one tick: nothing reaches the wire.
    let flash = host.mount_child(main, Element::class("Toast"))?;
    host.unmount(flash)?;
    settle(&executor, &scheduler);

    host.unmount(row)?;
    host.unmount_root("root")?;
    settle(&executor, &scheduler);

    inspector.detach();
    Ok(())
}
