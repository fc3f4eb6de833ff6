//! Self-Rendering Components
//!
//! A [`Component`] owns a root node and an effect. Whenever a cell read by its
//! render function changes, the effect renders again and reconciles the
//! root's children against the result. Parents that embed the component treat
//! its root as opaque, so this effect is the only writer of that subtree.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::reconcile::reconcile_children;
use super::tree::TreeNode;
use crate::reactive::{Disposer, Runtime, State};

/// A render function: produces the roots of a component.
pub type Render<N> = Rc<dyn Fn() -> Vec<N>>;

pub struct Component<N> {
    root: Rc<RefCell<N>>,
    render: State<Option<Render<N>>>,
    effect: Disposer,
}

impl<N: TreeNode + 'static> Component<N> {
    /// A component with no render function. It renders nothing until one is
    /// set.
    pub fn new(runtime: &Runtime, root: N) -> Self {
        let root = Rc::new(RefCell::new(root));
        let render: State<Option<Render<N>>> = runtime.state(None);

        let effect = {
            let (root, render) = (root.clone(), render.clone());
            runtime.effect(move || {
                let Some(render) = render.get() else {
                    return;
                };
                // Rendered before the root is borrowed so the render function
                // may read it
                let roots = render();
                match root.try_borrow_mut() {
                    Ok(mut root) => {
                        let mutations = reconcile_children(&mut *root, roots);
                        tracing::debug!(?mutations, "component rendered");
                    }
                    Err(_) => tracing::warn!("component root is borrowed; render skipped"),
                }
            })
        };

        Self {
            root,
            render,
            effect,
        }
    }

    pub fn with_render<F>(runtime: &Runtime, root: N, render: F) -> Self
    where
        F: Fn() -> Vec<N> + 'static,
    {
        let component = Self::new(runtime, root);
        component.set_render(render);
        component
    }

    /// Replace the render function. The component renders on the next flush.
    pub fn set_render<F>(&self, render: F)
    where
        F: Fn() -> Vec<N> + 'static,
    {
        let render: Render<N> = Rc::new(render);
        self.render.set(Some(render));
    }

    /// Stop rendering. The current content is left in place.
    pub fn clear_render(&self) {
        self.render.set(None);
    }

    pub fn has_render(&self) -> bool {
        self.render.with_untracked(Option::is_some)
    }

    pub fn root(&self) -> &Rc<RefCell<N>> {
        &self.root
    }

    /// Number of times the render effect has run, including runs with no
    /// render function set.
    pub fn run_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Stop the render effect. The root keeps its last content.
    pub fn dispose(&self) {
        self.effect.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }
}

impl<N> fmt::Debug for Component<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}
