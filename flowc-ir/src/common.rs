use flowc_utils::GetName;
#[cfg(debug_assertions)]
use flowc_utils::Id;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Alias for a RefCell contained in an Rc reference. This is the standard
/// handle for entities owned by a flow.
#[allow(clippy::upper_case_acronyms)]
pub type RRC<T> = Rc<RefCell<T>>;

/// Construct a new RRC.
pub fn rrc<T>(t: T) -> RRC<T> {
    Rc::new(RefCell::new(t))
}

/// A wrapper for a weak RefCell pointer. Used for back-edges in the graph
/// (producers, consumers, and function membership) so that entity cycles
/// do not keep each other alive.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug)]
pub struct WRC<T>
where
    T: GetName,
{
    pub(super) internal: Weak<RefCell<T>>,
    #[cfg(debug_assertions)]
    debug_name: Id,
}

impl<T: GetName> WRC<T> {
    /// Upgrade to the underlying shared pointer. Panics if the entity has
    /// been dropped, which means a back-edge outlived its owner.
    pub fn upgrade(&self) -> RRC<T> {
        let Some(r) = self.internal.upgrade() else {
            #[cfg(debug_assertions)]
            unreachable!(
                "weak reference points to a dropped entity `{}'",
                self.debug_name
            );
            #[cfg(not(debug_assertions))]
            unreachable!("weak reference points to a dropped entity");
        };
        r
    }

    /// True when this back-edge points at `other`. Identity comparison,
    /// not name comparison.
    pub fn points_to(&self, other: &RRC<T>) -> bool {
        std::ptr::eq(self.internal.as_ptr(), Rc::as_ptr(other))
    }
}

/// From implementation with the same signature as `Rc::downgrade`.
impl<T: GetName> From<&RRC<T>> for WRC<T> {
    fn from(internal: &RRC<T>) -> Self {
        Self {
            internal: Rc::downgrade(internal),
            #[cfg(debug_assertions)]
            debug_name: internal.borrow().name(),
        }
    }
}

/// Clone the weak reference inside the WRC.
impl<T: GetName> Clone for WRC<T> {
    fn clone(&self) -> Self {
        Self {
            internal: Weak::clone(&self.internal),
            #[cfg(debug_assertions)]
            debug_name: self.debug_name,
        }
    }
}
