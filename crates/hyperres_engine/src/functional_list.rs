/* 📖 # Why a persistent list for embedded paths?

While rendering, every related model extends the path of its parent
(`author`, then `author.books`, ...). Siblings share the same parent path, and
the recursion may be deep. Appending to a FunctionalList allocates one node that
points back at the shared prefix, so the parent's path is never copied or
mutated while its children are being written.
*/

use std::fmt;
use std::sync::Arc;

struct Node<T> {
    value: T,
    previous: Option<Arc<Node<T>>>,
}

/// Immutable list with O(1) append that shares its prefix with the list it was appended to.
pub struct FunctionalList<T> {
    last: Option<Arc<Node<T>>>,
    len: usize,
}

/// Dotted path of relation keys from the root model to an embedded one.
pub type EmbeddedPath = FunctionalList<String>;

impl<T> FunctionalList<T> {
    pub fn empty() -> Self {
        Self { last: None, len: 0 }
    }

    /// A new list ending in `value`. `self` is left untouched.
    pub fn append(&self, value: T) -> Self {
        Self {
            last: Some(Arc::new(Node {
                value,
                previous: self.last.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First element.
    pub fn head(&self) -> Option<&T> {
        self.iter().next()
    }

    /// Most recently appended element.
    pub fn last(&self) -> Option<&T> {
        self.last.as_ref().map(|node| &node.value)
    }

    /// Elements from first to last.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut values = Vec::with_capacity(self.len);
        let mut current = self.last.as_deref();
        while let Some(node) = current {
            values.push(&node.value);
            current = node.previous.as_deref();
        }
        values.into_iter().rev()
    }

    /// True if `self` was produced by appending to `prefix` (or is `prefix` itself).
    pub fn extends(&self, prefix: &FunctionalList<T>) -> bool {
        let mut current = self.last.as_ref();
        loop {
            match (current, prefix.last.as_ref()) {
                (None, None) => return true,
                (Some(node), Some(target)) if Arc::ptr_eq(node, target) => return true,
                (Some(node), _) => current = node.previous.as_ref(),
                (None, Some(_)) => return false,
            }
        }
    }
}

impl<T: AsRef<str>> FunctionalList<T> {
    pub fn join(&self, separator: &str) -> String {
        self.iter()
            .map(|value| value.as_ref())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl<T> Clone for FunctionalList<T> {
    fn clone(&self) -> Self {
        Self {
            last: self.last.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for FunctionalList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialEq> PartialEq for FunctionalList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for FunctionalList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
