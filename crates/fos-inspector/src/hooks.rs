//! Interception Layer
//!
//! Decorates a host's entry points: each wrapper runs the original first, then
//! the inspector callback with the same argument, and hands the original's
//! result back untouched.
//!
//! Several inspectors may wrap the same table and detach in any order. A
//! wrapper that something else has since wrapped over cannot be unlinked, so
//! it stays in the chain as a pass-through and the table remembers what it
//! wraps; the next restore that would reinstall it skips past it.

use std::cell::Cell;
use std::rc::Rc;

use crate::host::{EntryPointKind, EntryPoints, NodeEntry, RootEntry};

/// Inspector side of a node entry point
pub(crate) type NodeCallback<N> = Rc<dyn Fn(EntryPointKind, &N)>;
/// Inspector side of the root render entry point: request, rendered root
pub(crate) type RootCallback<N, R> = Rc<dyn Fn(&R, &N)>;

struct Saved<E> {
    original: E,
    wrapper: E,
}

/// Originals of every wrapped entry point
pub struct InstalledHooks<N, R> {
    nodes: Vec<(EntryPointKind, Saved<NodeEntry<N>>)>,
    render_root: Option<Saved<RootEntry<N, R>>>,
    /// Cleared on restore; wrappers then only forward to their original
    active: Rc<Cell<bool>>,
}

impl<N: 'static, R: 'static> InstalledHooks<N, R> {
    /// Wrap every entry point present in `table`
    pub(crate) fn install(
        table: &EntryPoints<N, R>,
        on_node: NodeCallback<N>,
        on_render_root: RootCallback<N, R>,
    ) -> Self {
        let active = Rc::new(Cell::new(true));

        let mut nodes = Vec::new();
        for kind in EntryPointKind::ALL {
            let Some(original) = table.get(kind) else {
                continue;
            };
            let inner = original.clone();
            let callback = on_node.clone();
            let live = active.clone();
            let wrapper: NodeEntry<N> = Rc::new(move |node: &N| {
                inner(node);
                if live.get() {
                    callback(kind, node);
                }
            });
            table.set(kind, Some(wrapper.clone()));
            nodes.push((kind, Saved { original, wrapper }));
        }

        let render_root = table.render_root_entry().map(|original| {
            let inner = original.clone();
            let live = active.clone();
            let wrapper: RootEntry<N, R> = Rc::new(move |request: &R| {
                let root = inner(request);
                if live.get() {
                    on_render_root(request, &root);
                }
                root
            });
            table.set_render_root(Some(wrapper.clone()));
            Saved { original, wrapper }
        });

        Self { nodes, render_root, active }
    }

    /// Entry points that were wrapped
    pub fn wrapped(&self) -> Vec<EntryPointKind> {
        self.nodes.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn wraps_render_root(&self) -> bool {
        self.render_root.is_some()
    }

    /// Stop forwarding to the inspector and unlink every wrapper that is
    /// still on top of its slot
    pub fn restore(self, table: &EntryPoints<N, R>) {
        self.active.set(false);

        for (kind, saved) in self.nodes {
            if table.is_installed(kind, &saved.wrapper) {
                let original = table.skip_retired(kind, saved.original);
                table.set(kind, Some(original));
            } else {
                tracing::debug!("{:?} entry point was wrapped again after attach; leaving a pass-through", kind);
                table.retire(kind, saved.wrapper, saved.original);
            }
        }
        if let Some(saved) = self.render_root {
            if table.is_render_root_installed(&saved.wrapper) {
                let original = table.skip_retired_render_root(saved.original);
                table.set_render_root(Some(original));
            } else {
                tracing::debug!("Root render entry point was wrapped again after attach; leaving a pass-through");
                table.retire_render_root(saved.wrapper, saved.original);
            }
        }
    }
}

impl<N, R> std::fmt::Debug for InstalledHooks<N, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledHooks")
            .field("nodes", &self.nodes.iter().map(|(kind, _)| *kind).collect::<Vec<_>>())
            .field("render_root", &self.render_root.is_some())
            .finish()
    }
}
