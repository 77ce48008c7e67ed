#![forbid(unsafe_code)]

//! Deterministic, in-memory component host.
//!
//! [`HeadlessHost`] mounts one render closure and implements the host
//! capabilities ([`Hooks`], [`LocalState`]) the way a UI framework would,
//! minus the UI:
//!
//! - local state slots are positional and persist across renders;
//! - `LocalState::set` never renders synchronously, it marks the component
//!   dirty and bumps the trigger counter;
//! - [`HeadlessHost::flush`] re-renders until no slot is dirty;
//! - effects run after each render whose deps changed, with the previous
//!   cleanup run first; unmount runs every outstanding cleanup.
//!
//! Every `set` counts as a change: the host does not compare values.
//!
//! # Panics
//!
//! Calling hooks in a different order or number than on the first render
//! is a bug in the render closure and panics with a message naming the
//! hook.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use eventsync_runtime::host::{Cleanup, Effect, Hooks, LocalState};
use tracing::trace;

/// Upper bound on renders per [`HeadlessHost::flush`] before it is treated
/// as a render loop.
pub const MAX_FLUSH_RENDERS: usize = 64;

/// State shared between the host and the slots it handed out.
struct HostShared {
    dirty: Cell<bool>,
    triggers: Cell<usize>,
    mounted: Cell<bool>,
}

struct HeadlessState<T> {
    value: RefCell<T>,
    shared: Weak<HostShared>,
}

impl<T: Clone> LocalState<T> for HeadlessState<T> {
    fn get(&self) -> T {
        self.value.borrow().clone()
    }

    fn set(&self, value: T) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if !shared.mounted.get() {
            return;
        }
        *self.value.borrow_mut() = value;
        shared.triggers.set(shared.triggers.get() + 1);
        shared.dirty.set(true);
    }
}

struct EffectSlot {
    deps: Vec<String>,
    cleanup: Option<Cleanup>,
}

#[derive(Default)]
struct SlotTable {
    states: Vec<Rc<dyn Any>>,
    effects: Vec<EffectSlot>,
}

/// Hook context passed to the render closure.
pub struct HookCx<'a> {
    shared: &'a Rc<HostShared>,
    slots: &'a mut SlotTable,
    first_render: bool,
    state_cursor: usize,
    effect_cursor: usize,
    pending: Vec<(usize, Effect)>,
}

impl HookCx<'_> {
    fn finish(self) -> Vec<(usize, Effect)> {
        if !self.first_render {
            assert_eq!(
                self.state_cursor,
                self.slots.states.len(),
                "hook order changed: local_state called a different number of times"
            );
            assert_eq!(
                self.effect_cursor,
                self.slots.effects.len(),
                "hook order changed: effect_on_change called a different number of times"
            );
        }
        self.pending
    }
}

impl Hooks for HookCx<'_> {
    fn local_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Rc<dyn LocalState<T>> {
        let index = self.state_cursor;
        self.state_cursor += 1;

        if let Some(existing) = self.slots.states.get(index) {
            return match Rc::clone(existing).downcast::<HeadlessState<T>>() {
                Ok(slot) => slot,
                Err(_) => panic!("hook order changed: local_state #{index} changed type"),
            };
        }
        assert!(
            self.first_render,
            "hook order changed: local_state #{index} was not called on the first render"
        );
        let slot = Rc::new(HeadlessState {
            value: RefCell::new(init()),
            shared: Rc::downgrade(self.shared),
        });
        self.slots.states.push(Rc::clone(&slot) as Rc<dyn Any>);
        slot
    }

    fn effect_on_change(&mut self, deps: Vec<String>, effect: Effect) {
        let index = self.effect_cursor;
        self.effect_cursor += 1;

        match self.slots.effects.get_mut(index) {
            Some(slot) => {
                if slot.deps != deps {
                    slot.deps = deps;
                    self.pending.push((index, effect));
                }
            }
            None => {
                assert!(
                    self.first_render,
                    "hook order changed: effect_on_change #{index} was not called on the first render"
                );
                self.slots.effects.push(EffectSlot {
                    deps,
                    cleanup: None,
                });
                self.pending.push((index, effect));
            }
        }
    }
}

type RenderFn<R> = Box<dyn FnMut(&mut HookCx<'_>) -> R>;

/// A mounted component driven by hand.
pub struct HeadlessHost<R> {
    shared: Rc<HostShared>,
    slots: SlotTable,
    render: RenderFn<R>,
    output: R,
    renders: usize,
}

impl<R: fmt::Debug> fmt::Debug for HeadlessHost<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessHost")
            .field("output", &self.output)
            .field("renders", &self.renders)
            .field("triggers", &self.shared.triggers.get())
            .field("dirty", &self.shared.dirty.get())
            .field("mounted", &self.shared.mounted.get())
            .finish()
    }
}

fn render_pass<R>(
    shared: &Rc<HostShared>,
    slots: &mut SlotTable,
    render: &mut RenderFn<R>,
    first_render: bool,
) -> R {
    shared.dirty.set(false);
    let (output, pending) = {
        let mut cx = HookCx {
            shared,
            slots: &mut *slots,
            first_render,
            state_cursor: 0,
            effect_cursor: 0,
            pending: Vec::new(),
        };
        let output = render(&mut cx);
        (output, cx.finish())
    };

    for (index, effect) in pending {
        let slot = &mut slots.effects[index];
        if let Some(cleanup) = slot.cleanup.take() {
            cleanup();
        }
        slot.cleanup = Some(effect());
    }
    output
}

impl<R> HeadlessHost<R> {
    /// Render `render` once and commit its effects.
    pub fn mount<F>(render: F) -> Self
    where
        F: FnMut(&mut HookCx<'_>) -> R + 'static,
        R: 'static,
    {
        let shared = Rc::new(HostShared {
            dirty: Cell::new(false),
            triggers: Cell::new(0),
            mounted: Cell::new(true),
        });
        let mut slots = SlotTable::default();
        let mut render: RenderFn<R> = Box::new(render);
        let output = render_pass(&shared, &mut slots, &mut render, true);
        trace!("headless component mounted");
        Self {
            shared,
            slots,
            render,
            output,
            renders: 1,
        }
    }

    /// Render unconditionally, as a parent re-render would.
    ///
    /// # Panics
    ///
    /// Panics if the component was unmounted.
    pub fn rerender(&mut self) {
        assert!(self.shared.mounted.get(), "rerender after unmount");
        self.output = render_pass(&self.shared, &mut self.slots, &mut self.render, false);
        self.renders += 1;
    }

    /// Re-render while a local state slot is dirty. Returns the number of
    /// renders performed.
    ///
    /// # Panics
    ///
    /// Panics if the component keeps dirtying itself for more than
    /// [`MAX_FLUSH_RENDERS`] renders.
    pub fn flush(&mut self) -> usize {
        let mut renders = 0;
        while self.shared.dirty.get() && self.shared.mounted.get() {
            assert!(
                renders < MAX_FLUSH_RENDERS,
                "component did not settle after {MAX_FLUSH_RENDERS} renders"
            );
            self.rerender();
            renders += 1;
        }
        renders
    }

    /// Output of the latest render.
    pub fn output(&self) -> &R {
        &self.output
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Number of `LocalState::set` calls while mounted.
    pub fn trigger_count(&self) -> usize {
        self.shared.triggers.get()
    }

    /// Whether a re-render is pending.
    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.mounted.get()
    }

    /// Run every outstanding effect cleanup. Later `LocalState::set` calls
    /// are ignored. Idempotent.
    pub fn unmount(&mut self) {
        if !self.shared.mounted.replace(false) {
            return;
        }
        self.shared.dirty.set(false);
        for slot in &mut self.slots.effects {
            if let Some(cleanup) = slot.cleanup.take() {
                cleanup();
            }
        }
        trace!(renders = self.renders, "headless component unmounted");
    }
}

impl<R> Drop for HeadlessHost<R> {
    fn drop(&mut self) {
        self.unmount();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
