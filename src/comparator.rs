use std::cmp::Ordering;

/// A total order over `T`, injected into a [`Tree`](crate::rbtree::Tree).
///
/// Both predicates must agree on a single strict weak ordering: if neither
/// `less(a, b)` nor `less(b, a)` holds, then `equal(a, b)` must hold.
/// They are called many times per operation and must not have side effects.
pub trait Comparator<T: ?Sized> {
    fn equal(&self, a: &T, b: &T) -> bool;
    fn less(&self, a: &T, b: &T) -> bool;
}

/// Orders values by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<T: ?Sized + Ord> Comparator<T> for Natural {
    fn equal(&self, a: &T, b: &T) -> bool {
        a == b
    }

    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

/// Any `fn(&T, &T) -> Ordering` closure is a comparator.
impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn equal(&self, a: &T, b: &T) -> bool {
        self(a, b) == Ordering::Equal
    }

    fn less(&self, a: &T, b: &T) -> bool {
        self(a, b) == Ordering::Less
    }
}
