//! Read-only context available to an action while it applies.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::definition::Workflow;

/// Read access to the props of the node an action is applying to.
///
/// Valid only for the duration of the `apply` call. The node invalidates the
/// backing storage as soon as `apply` returns; reading from a clone kept
/// past that point is a programmer error and panics.
pub struct ApplyContext<W: Workflow> {
    props: Rc<RefCell<Option<Rc<W>>>>,
}

impl<W: Workflow> ApplyContext<W> {
    pub(crate) fn new(workflow: Rc<W>) -> Self {
        Self {
            props: Rc::new(RefCell::new(Some(workflow))),
        }
    }

    /// The workflow value (props) of the applying node.
    ///
    /// # Panics
    /// Panics when called after the action finished applying.
    pub fn props(&self) -> Rc<W> {
        match self.props.borrow().as_ref() {
            Some(workflow) => Rc::clone(workflow),
            None => panic!(
                "[{}] ApplyContext read after its action finished applying",
                type_name::<W>()
            ),
        }
    }

    /// Runs `f` against the props without cloning the handle.
    ///
    /// # Panics
    /// Panics when called after the action finished applying.
    pub fn with_props<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.props())
    }

    /// False once the owning `apply` call has returned.
    pub fn is_valid(&self) -> bool {
        self.props.borrow().is_some()
    }

    pub(crate) fn invalidate(&self) {
        self.props.borrow_mut().take();
    }
}

impl<W: Workflow> Clone for ApplyContext<W> {
    fn clone(&self) -> Self {
        Self {
            props: Rc::clone(&self.props),
        }
    }
}

impl<W: Workflow> fmt::Debug for ApplyContext<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyContext")
            .field("workflow", &type_name::<W>())
            .field("valid", &self.is_valid())
            .finish()
    }
}
