//! Index-linked lists over a shared slot arena
//!
//! Nodes live in a `Vec`-backed arena and link to each other by slot index,
//! so unlinking a node whose slot is known is O(1). Several `List`s may thread
//! through the same arena (LFU keeps one list per frequency).

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Slot arena owning list nodes; freed slots are reused
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Store `value` in an unlinked node and return its slot
    pub(crate) fn alloc(&mut self, value: T) -> usize {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        if let Some(idx) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(idx) {
                *slot = Some(node);
                return idx;
            }
        }
        self.slots.push(Some(node));
        self.slots.len() - 1
    }

    /// Release a slot. The node must already be unlinked.
    pub(crate) fn release(&mut self, idx: usize) -> Option<T> {
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        Some(node.value)
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&T> {
        self.node(idx).map(|node| &node.value)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.node_mut(idx).map(|node| &mut node.value)
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    #[cfg(test)]
    pub(crate) fn capacity_used(&self) -> usize {
        self.slots.len()
    }

    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }
}

/// Doubly linked list of arena slots; head is most recent, tail is oldest
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct List {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl List {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn back(&self) -> Option<usize> {
        self.tail
    }

    pub(crate) fn push_front<T>(&mut self, arena: &mut Arena<T>, idx: usize) {
        let old_head = self.head;
        if let Some(node) = arena.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        } else {
            return;
        }
        match old_head.and_then(|h| arena.node_mut(h)) {
            Some(head) => head.prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
    }

    /// Detach `idx` from this list. The slot stays allocated.
    pub(crate) fn unlink<T>(&mut self, arena: &mut Arena<T>, idx: usize) {
        let Some(node) = arena.node_mut(idx) else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());

        match prev.and_then(|p| arena.node_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| arena.node_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
        self.len = self.len.saturating_sub(1);
    }

    pub(crate) fn move_to_front<T>(&mut self, arena: &mut Arena<T>, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(arena, idx);
        self.push_front(arena, idx);
    }

    /// Slots from head to tail
    #[cfg(test)]
    pub(crate) fn iter<'a, T>(&self, arena: &'a Arena<T>) -> impl Iterator<Item = &'a T> + 'a {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = arena.node(cursor?)?;
            cursor = node.next;
            Some(&node.value)
        })
    }
}
