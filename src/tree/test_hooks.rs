//! Test-only structure probes.
//!
//! Copy-on-write assertions need node *identity*, which the public API
//! deliberately hides. These hooks expose just enough of the internals
//! for unit tests: the chain of node addresses on the path to a key, and
//! the root's separator layout.

use super::SnapTree;
use crate::node::Variant;
use crate::refs::RefCounted;

impl<K, V: RefCounted> SnapTree<K, V> {
    /// Node identities on the descent path to `key`, root first.
    pub(crate) fn path_identities(&self, key: &K) -> Vec<*const ()> {
        let mut path = Vec::new();
        let Some(mut node) = self.root else {
            return path;
        };

        loop {
            path.push(node.as_ptr().cast::<()>());
            match node.node().variant() {
                Variant::Leaf(_) => return path,
                Variant::Branch(branch) => match branch.descend(key, self.compare) {
                    Some(child) => node = child,
                    None => return path,
                },
            }
        }
    }

}

impl<K: Clone, V: RefCounted> SnapTree<K, V> {
    /// The root branch's separators and each child's min key.
    ///
    /// # Panics
    /// Panics if the root is missing or a leaf.
    pub(crate) fn root_separators_and_child_mins(&self) -> (Vec<K>, Vec<K>) {
        let root = self.root.expect("tree has a root");
        let Variant::Branch(branch) = root.node().variant() else {
            panic!("root is a leaf");
        };

        let mut separators = Vec::with_capacity(branch.len());
        let mut child_mins = Vec::with_capacity(branch.len());
        for index in 0..branch.len() {
            separators.push(branch.item(index).key.clone());
            child_mins.push(branch.child(index).node().min_key().clone());
        }
        (separators, child_mins)
    }
}
