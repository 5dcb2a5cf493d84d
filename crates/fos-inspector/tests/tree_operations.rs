//! Tree operation tests
//!
//! Drives a legacy host through mounts, updates and unmounts and checks the
//! batches the inspector emits.

use std::rc::Rc;

use fos_inspector::operations::decode_batch;
use fos_inspector::{
    DeferredQueue, ElementType, EntryPointKind, HostRenderer, Inspector, InspectorConfig,
    InspectorError, NodeId, Operation, RecordingHook, Scheduler, Task, TaskHandle,
};
use fos_legacy_host::{Element, Generation, InstanceId, LegacyHost, RenderRequest};

struct Harness {
    host: Rc<LegacyHost>,
    hook: Rc<RecordingHook>,
    queue: Rc<DeferredQueue>,
    inspector: Inspector<LegacyHost>,
}

impl Harness {
    fn new(generation: Generation) -> Self {
        Self::with_host(LegacyHost::new(generation), InspectorConfig::default())
    }

    fn with_host(host: Rc<LegacyHost>, config: InspectorConfig) -> Self {
        let hook = Rc::new(RecordingHook::new());
        let queue = Rc::new(DeferredQueue::new());
        let inspector = Inspector::attach(host.clone(), hook.clone(), queue.clone(), config).unwrap();
        Self { host, hook, queue, inspector }
    }

    fn id(&self, instance: InstanceId) -> NodeId {
        self.inspector.id_of(&instance).unwrap()
    }

    /// Run deferred flushes and decode everything emitted so far
    fn flush(&self) -> Vec<fos_inspector::OperationBatch> {
        self.queue.run_until_idle();
        self.hook
            .take()
            .iter()
            .map(|words| decode_batch(words).unwrap())
            .collect()
    }
}

/// Scheduler whose `cancel` is a no-op, so queued flushes outlive detach
struct UncancellableQueue(DeferredQueue);

impl Scheduler for UncancellableQueue {
    fn schedule(&self, task: Task) -> TaskHandle {
        self.0.schedule(task)
    }

    fn cancel(&self, _handle: TaskHandle) {}
}

fn id(raw: u32) -> NodeId {
    NodeId::new(raw).unwrap()
}

// ============================================================================
// MOUNT / UNMOUNT SCENARIO
// ============================================================================

#[test]
fn test_root_then_cancelled_child_then_reused_id() {
    let h = Harness::new(Generation::Native);

    let root = h.host.render(Element::host("div"), "app").unwrap();
    assert_eq!(h.hook.take(), vec![vec![1, 1, 1, 1, 11, 0, 1]]);
    assert!(h.queue.is_empty());

    let child = h.host.mount_child(root, Element::anonymous_class()).unwrap();
    assert_eq!(h.inspector.id_of(&child), Some(id(2)));
    h.host.unmount(child).unwrap();
    assert!(h.hook.is_empty());
    assert_eq!(h.queue.run_until_idle(), 1);
    assert_eq!(h.hook.take(), vec![vec![1, 1]]);
    assert_eq!(h.inspector.node_for(id(2)), None);
    assert_eq!(h.inspector.id_of(&child), None);

    let replacement = h.host.mount_child(root, Element::anonymous_class()).unwrap();
    assert_ne!(replacement, child);
    assert_eq!(h.queue.run_until_idle(), 1);
    assert_eq!(h.hook.take(), vec![vec![1, 1, 1, 2, 1, 1, 0, 0, 0]]);
    assert_eq!(h.inspector.id_of(&replacement), Some(id(2)));
}

#[test]
fn test_mutations_in_one_tick_coalesce() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div"), "app").unwrap();
    h.hook.take();

    h.host.mount_child(root, Element::class("A")).unwrap();
    h.host.mount_child(root, Element::class("B").key("b")).unwrap();
    h.host.update(root).unwrap();
    assert_eq!(h.queue.len(), 1);
    assert_eq!(h.inspector.scheduled_flushes(), 1);

    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.renderer_id, 1);
    assert_eq!(batch.root_id, id(1));

    let names: Vec<Option<&str>> = batch
        .operations
        .iter()
        .map(|op| match op {
            Operation::AddNode(record) => record.display_name.as_deref(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(names, vec![Some("A"), Some("B")]);
    match &batch.operations[1] {
        Operation::AddNode(record) => assert_eq!(record.key.as_deref(), Some("b")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_update_alone_emits_header_only_batch() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div").child(Element::class("App")), "app").unwrap();
    h.hook.take();

    h.host.update(root).unwrap();
    assert_eq!(h.queue.run_until_idle(), 1);
    assert_eq!(h.hook.take(), vec![vec![1, 1]]);
}

// ============================================================================
// CRAWL
// ============================================================================

#[test]
fn test_parent_add_precedes_child_add() {
    let h = Harness::new(Generation::LegacyDom);
    let tree = Element::host("div").child(
        Element::class("App").child(
            Element::host("main").children([
                Element::class("Sidebar").child(Element::function("Logo").child(Element::class("Icon"))),
                Element::class("Content").child(Element::host("p").child(Element::text("hello"))),
            ]),
        ),
    );
    h.host.render(tree, "app").unwrap();

    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    let operations = &batches[0].operations;
    assert!(matches!(operations[0], Operation::AddRoot { .. }));

    let mut seen = vec![batches[0].root_id];
    let mut parents = Vec::new();
    for op in &operations[1..] {
        let Operation::AddNode(record) = op else {
            panic!("unexpected {:?}", op);
        };
        assert_eq!(record.element_type, ElementType::Class);
        assert!(seen.contains(&record.parent_id), "{} added before its parent", record.id);
        seen.push(record.id);
        parents.push((record.display_name.clone().unwrap_or_default(), record.parent_id));
    }

    let id_of = |name: &str| {
        operations
            .iter()
            .find_map(|op| match op {
                Operation::AddNode(record) if record.display_name.as_deref() == Some(name) => Some(record.id),
                _ => None,
            })
            .unwrap()
    };
    // Function and host components are elided; children hang off the
    // nearest class ancestor.
    assert_eq!(parents.len(), 4);
    assert!(parents.contains(&("Sidebar".to_string(), id_of("App"))));
    assert!(parents.contains(&("Icon".to_string(), id_of("Sidebar"))));
    assert!(parents.contains(&("Content".to_string(), id_of("App"))));
    assert!(parents.contains(&("App".to_string(), batches[0].root_id)));
}

#[test]
fn test_owner_is_reported() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div").child(Element::class("App")), "app").unwrap();
    let app = h.host.children(&root)[0];
    h.hook.take();

    let child = h.host.mount_child(app, Element::class("Row")).unwrap();
    let batches = h.flush();
    match &batches[0].operations[..] {
        [Operation::AddNode(record)] => {
            assert_eq!(record.id, h.id(child));
            assert_eq!(record.owner_id, Some(h.id(app)));
            assert_eq!(record.parent_id, h.id(app));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_unmount_emits_remove_for_known_nodes() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div"), "app").unwrap();
    let panel = h
        .host
        .mount_child(root, Element::class("Panel").child(Element::host("div").child(Element::class("Row"))))
        .unwrap();
    let panel_id = h.id(panel);
    h.flush();
    let row_id = h.id(h.host.children(&h.host.children(&panel)[0])[0]);

    h.host.unmount(panel).unwrap();
    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].operations,
        vec![Operation::Remove { id: row_id }, Operation::Remove { id: panel_id }]
    );
    assert_eq!(h.inspector.node_for(panel_id), None);
    assert_eq!(h.inspector.node_for(row_id), None);
}

#[test]
fn test_cancelled_subtree_releases_every_id() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div"), "app").unwrap();
    h.hook.take();

    let panel = h
        .host
        .mount_child(root, Element::class("Panel").children([Element::class("A"), Element::host("hr")]))
        .unwrap();
    h.host.unmount(panel).unwrap();
    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].operations.is_empty());
    for raw in 2..=4 {
        assert_eq!(h.inspector.node_for(id(raw)), None);
    }

    let next = h.host.mount_child(root, Element::class("Next")).unwrap();
    assert_eq!(h.inspector.id_of(&next), Some(id(2)));
}

#[test]
fn test_unmount_root_removes_everything() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div").child(Element::class("App")), "app").unwrap();
    let app_id = h.id(h.host.children(&root)[0]);
    h.hook.take();
    assert_eq!(h.inspector.roots(), vec![id(1)]);

    h.host.unmount_root("app").unwrap();
    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].root_id, id(1));
    assert_eq!(
        batches[0].operations,
        vec![Operation::Remove { id: app_id }, Operation::Remove { id: id(1) }]
    );
    assert!(h.inspector.roots().is_empty());
}

#[test]
fn test_roots_flush_independently() {
    let h = Harness::new(Generation::Native);
    let left = h.host.render(Element::host("div"), "left").unwrap();
    let right = h.host.render(Element::host("div"), "right").unwrap();
    h.hook.take();

    h.host.mount_child(left, Element::class("L")).unwrap();
    h.host.mount_child(right, Element::class("R")).unwrap();
    assert_eq!(h.queue.len(), 2);

    let batches = h.flush();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].root_id, h.id(left));
    assert_eq!(batches[1].root_id, h.id(right));
    assert_eq!(batches[0].operations.len(), 1);
    assert_eq!(batches[1].operations.len(), 1);
}

#[test]
fn test_render_into_container_replaces_root() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div"), "app").unwrap();
    h.hook.take();

    h.host.mount_child(root, Element::class("A")).unwrap();
    assert_eq!(h.queue.len(), 1);

    let replacement = h.host.render(Element::host("div"), "app").unwrap();
    let new_root = h.id(replacement);
    let batches = h.flush();
    assert_eq!(batches.len(), 2);

    // The new root flushes synchronously; the old one on the next tick.
    assert_eq!(batches[0].root_id, new_root);
    assert!(matches!(&batches[0].operations[..], [Operation::AddRoot { id, .. }] if *id == new_root));
    assert_eq!(batches[1].root_id, id(1));
    assert_eq!(batches[1].operations, vec![Operation::Remove { id: id(1) }]);
    assert_eq!(h.inspector.roots(), vec![new_root]);
}

// ============================================================================
// ATTACH / DETACH
// ============================================================================

#[test]
fn test_attach_reports_existing_roots() {
    let host = LegacyHost::new(Generation::Native);
    host.render(Element::host("div").child(Element::class("App").child(Element::class("Row"))), "app")
        .unwrap();

    let h = Harness::with_host(host, InspectorConfig::default());
    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].operations.len(), 3);
    assert!(matches!(&batches[0].operations[0], Operation::AddRoot { id, .. } if *id == batches[0].root_id));
}

#[test]
fn test_attach_without_crawl_stays_quiet() {
    let host = LegacyHost::new(Generation::Native);
    host.render(Element::host("div"), "app").unwrap();

    let config = InspectorConfig { crawl_existing_roots: false, ..InspectorConfig::default() };
    let h = Harness::with_host(host, config);
    assert!(h.hook.is_empty());
    assert!(h.inspector.roots().is_empty());
}

#[test]
fn test_config_reaches_the_wire() {
    let config = InspectorConfig {
        renderer_id: 7,
        supports_profiling: true,
        owner_metadata: false,
        crawl_existing_roots: true,
    };
    let h = Harness::with_host(LegacyHost::new(Generation::Native), config);
    h.host.render(Element::host("div"), "app").unwrap();
    assert_eq!(h.hook.take(), vec![vec![7, 1, 1, 1, 11, 1, 0]]);
}

#[test]
fn test_attach_needs_entry_points() {
    let host = LegacyHost::new(Generation::Native);
    for kind in EntryPointKind::ALL {
        host.entry_points().set(kind, None);
    }
    host.entry_points().set_render_root(None);

    let result = Inspector::attach(
        host,
        Rc::new(RecordingHook::new()),
        Rc::new(DeferredQueue::new()),
        InspectorConfig::default(),
    );
    assert!(matches!(result, Err(InspectorError::NothingToIntercept)));
}

#[test]
fn test_detach_restores_entry_points() {
    let host = LegacyHost::new(Generation::Native);
    let originals: Vec<_> = EntryPointKind::ALL
        .iter()
        .map(|&kind| host.entry_points().get(kind).unwrap())
        .collect();
    let original_render = host.entry_points().render_root_entry().unwrap();

    let h = Harness::with_host(host, InspectorConfig::default());
    let wrapped = h.host.entry_points().get(EntryPointKind::Mount).unwrap();
    assert!(!Rc::ptr_eq(&wrapped, &originals[0]));

    h.inspector.detach();
    h.inspector.detach();
    assert!(!h.inspector.is_attached());
    for (kind, original) in EntryPointKind::ALL.iter().zip(&originals) {
        assert!(Rc::ptr_eq(&h.host.entry_points().get(*kind).unwrap(), original));
    }
    assert!(Rc::ptr_eq(&h.host.entry_points().render_root_entry().unwrap(), &original_render));

    h.host.render(Element::host("div"), "app").unwrap();
    assert!(h.hook.is_empty());
    assert!(h.queue.is_empty());
}

#[test]
fn test_detach_with_flush_outstanding() {
    let h = Harness::new(Generation::Native);
    let root = h.host.render(Element::host("div"), "app").unwrap();
    h.hook.take();

    h.host.mount_child(root, Element::class("A")).unwrap();
    assert_eq!(h.inspector.scheduled_flushes(), 1);
    h.inspector.detach();

    assert_eq!(h.inspector.scheduled_flushes(), 0);
    h.queue.run_until_idle();
    assert!(h.hook.is_empty());
}

#[test]
fn test_dropping_inspector_detaches() {
    let host = LegacyHost::new(Generation::Native);
    let original = host.entry_points().get(EntryPointKind::Mount).unwrap();
    let h = Harness::with_host(host, InspectorConfig::default());
    let Harness { host, hook, queue, inspector } = h;

    drop(inspector);
    assert!(Rc::ptr_eq(&host.entry_points().get(EntryPointKind::Mount).unwrap(), &original));
    host.render(Element::host("div"), "app").unwrap();
    queue.run_until_idle();
    assert!(hook.is_empty());
}

#[test]
fn test_queued_flush_after_detach_is_inert() {
    let host = LegacyHost::new(Generation::Native);
    let hook = Rc::new(RecordingHook::new());
    let queue = Rc::new(UncancellableQueue(DeferredQueue::new()));
    let inspector =
        Inspector::attach(host.clone(), hook.clone(), queue.clone(), InspectorConfig::default()).unwrap();

    let root = host.render(Element::host("div"), "app").unwrap();
    // The flush superseded by the synchronous root flush finds its slot gone.
    assert_eq!(queue.0.run_until_idle(), 1);
    assert_eq!(hook.take().len(), 1);

    host.mount_child(root, Element::class("A")).unwrap();
    inspector.detach();
    assert_eq!(queue.0.len(), 1);
    assert_eq!(queue.0.run_until_idle(), 1);
    assert!(hook.is_empty());
}

#[test]
fn test_two_inspectors_detach_in_either_order() {
    for first_out in ["a", "b"] {
        let host = LegacyHost::new(Generation::Native);
        let originals: Vec<_> = EntryPointKind::ALL
            .iter()
            .map(|&kind| host.entry_points().get(kind).unwrap())
            .collect();
        let original_render = host.entry_points().render_root_entry().unwrap();

        let a = Harness::with_host(host.clone(), InspectorConfig::default());
        let b = Harness::with_host(host.clone(), InspectorConfig::default());
        let root = host.render(Element::host("div"), "app").unwrap();
        assert_eq!(a.flush().len(), 1);
        assert_eq!(b.flush().len(), 1);

        let (gone, stays) = if first_out == "a" { (&a, &b) } else { (&b, &a) };
        gone.inspector.detach();

        host.mount_child(root, Element::class("Row")).unwrap();
        assert!(gone.flush().is_empty(), "{first_out} detached first");
        let batches = stays.flush();
        assert_eq!(batches.len(), 1, "{first_out} detached first");
        assert!(matches!(
            &batches[0].operations[..],
            [Operation::AddNode(record)] if record.display_name.as_deref() == Some("Row")
        ));

        stays.inspector.detach();
        for (kind, original) in EntryPointKind::ALL.iter().zip(&originals) {
            assert!(Rc::ptr_eq(&host.entry_points().get(*kind).unwrap(), original), "{kind:?}");
        }
        assert!(Rc::ptr_eq(&host.entry_points().render_root_entry().unwrap(), &original_render));
    }
}

#[test]
fn test_root_mounted_before_attach_is_announced() {
    let host = LegacyHost::new(Generation::Native);
    let root = host.render(Element::host("div").child(Element::class("Old")), "app").unwrap();

    let config = InspectorConfig { crawl_existing_roots: false, ..InspectorConfig::default() };
    let h = Harness::with_host(host, config);
    h.host.mount_child(root, Element::class("A")).unwrap();

    let batches = h.flush();
    assert_eq!(batches.len(), 1);
    let root_id = h.id(root);
    assert_eq!(batches[0].root_id, root_id);

    let ops = &batches[0].operations;
    assert_eq!(ops.len(), 3);
    assert!(matches!(&ops[0], Operation::AddRoot { id, .. } if *id == root_id));
    let names: Vec<_> = ops[1..]
        .iter()
        .map(|op| match op {
            Operation::AddNode(record) => {
                assert_eq!(record.parent_id, root_id);
                record.display_name.clone()
            }
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(names, vec![Some("Old".to_string()), Some("A".to_string())]);
    assert_eq!(h.inspector.roots(), vec![root_id]);

    // Already announced: later batches only carry what changed.
    h.host.mount_child(root, Element::class("B")).unwrap();
    let batches = h.flush();
    assert_eq!(batches[0].operations.len(), 1);
}

#[test]
fn test_render_root_returning_no_root_is_ignored() {
    let host = LegacyHost::new(Generation::Native);
    host.entry_points()
        .set_render_root(Some(Rc::new(|_: &RenderRequest| InstanceId::NONE)));

    let h = Harness::with_host(host, InspectorConfig::default());
    assert!(h.host.render(Element::host("div"), "app").is_err());
    assert!(h.hook.is_empty());
    assert!(h.inspector.roots().is_empty());
    assert_eq!(h.inspector.id_of(&InstanceId::NONE), None);
}
