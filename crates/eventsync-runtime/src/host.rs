#![forbid(unsafe_code)]

//! Capabilities a UI host must provide to run path bindings.
//!
//! The binding layer never talks to a concrete UI framework. It needs two
//! things from whatever renders the component:
//!
//! - a per-component **local state slot** whose setter schedules a
//!   re-render ([`LocalState`], obtained from [`Hooks::local_state`]);
//! - an **effect keyed by a dependency list**, re-run when the list
//!   changes, with a cleanup that always runs before the re-run and on
//!   teardown ([`Hooks::effect_on_change`]).
//!
//! A slot whose setter is never called doubles as a value that survives
//! re-renders, so no separate "ref" capability is required.
//!
//! # Contract
//!
//! 1. Within one component, the n-th `local_state` call of every render
//!    returns the same slot. The `init` closure runs on the first render
//!    only.
//! 2. `effect_on_change` runs its effect after the render that declared it,
//!    on the first render and whenever `deps` differ from the previous
//!    render's `deps`.
//! 3. The previous cleanup runs before the effect re-runs, and every
//!    outstanding cleanup runs when the component is torn down.
//! 4. `LocalState::set` may be called from outside a render (for example
//!    from a change handler) and must not re-render synchronously.

use std::rc::Rc;

/// Teardown returned by an effect.
pub type Cleanup = Box<dyn FnOnce()>;

/// Effect body registered through [`Hooks::effect_on_change`].
pub type Effect = Box<dyn FnOnce() -> Cleanup>;

/// A value slot owned by one component.
pub trait LocalState<T> {
    /// Current value of the slot.
    fn get(&self) -> T;

    /// Replace the value and schedule a re-render of the owning component.
    fn set(&self, value: T);
}

/// Render-time hooks supplied by the host.
pub trait Hooks {
    /// The component's next local state slot.
    fn local_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Rc<dyn LocalState<T>>;

    /// Run `effect` after this render if `deps` changed since the last one.
    fn effect_on_change(&mut self, deps: Vec<String>, effect: Effect);
}

/// Wrap a closure as a [`Cleanup`].
pub fn cleanup(f: impl FnOnce() + 'static) -> Cleanup {
    Box::new(f)
}
