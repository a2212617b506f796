//! A decrease-key min-heap keyed over a fixed id space `[0, max_size)`.
//!
//! This is the only primitive Dijkstra relies on for its `O((V+E) log V)`
//! bound: `update`/`pop` run in `O(log n)`, `top` in `O(1)`.

use super::NodeId;

const INFINITE: i64 = i64::MAX;

/// Binary heap over node ids with an explicit position index, so a node's
/// key can be lowered in place instead of re-inserted.
pub struct IndexedPriorityQueue {
    /// heap[i] is a node id; heap[0] holds the minimum key.
    heap: Vec<u32>,
    /// position[id] is heap's index of id, or usize::MAX if id is not queued.
    position: Vec<usize>,
    /// key[id] is id's current key, or INFINITE if never updated.
    key: Vec<i64>,
}

const NOT_QUEUED: usize = usize::MAX;

impl IndexedPriorityQueue {
    /// Allocates a queue over the id space `[0, max_size)`, empty, all keys
    /// at +infinity.
    pub fn new(max_size: usize) -> Self {
        let mut q = Self {
            heap: Vec::with_capacity(max_size),
            position: vec![NOT_QUEUED; max_size],
            key: vec![INFINITE; max_size],
        };
        q.init();
        q
    }

    pub fn max_size(&self) -> usize {
        self.key.len()
    }

    pub fn size(&self) -> usize {
        self.heap.len()
    }

    pub fn empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Resets every key to +infinity and empties the heap.
    pub fn init(&mut self) {
        self.heap.clear();
        self.position.iter_mut().for_each(|p| *p = NOT_QUEUED);
        self.key.iter_mut().for_each(|k| *k = INFINITE);
    }

    /// Read-only view of every id's current key (`i64::MAX` for ids never
    /// updated, whether or not they are still queued).
    pub fn value(&self) -> &[i64] {
        &self.key
    }

    /// Lowers `id`'s key to `min(current, new_key)`, inserting it if it was
    /// not already queued. No-op if `new_key` does not improve the key.
    pub fn update(&mut self, id: NodeId, new_key: i64) {
        let i = id.index();
        if new_key >= self.key[i] {
            return;
        }
        self.key[i] = new_key;
        if self.position[i] == NOT_QUEUED {
            let pos = self.heap.len();
            self.heap.push(id.0);
            self.position[i] = pos;
        }
        self.sift_up(self.position[i]);
    }

    /// The id with the minimum key.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn top(&self) -> NodeId {
        assert!(!self.empty(), "top() called on an empty IndexedPriorityQueue");
        NodeId(self.heap[0])
    }

    /// Removes the minimum-key id.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn pop(&mut self) {
        assert!(!self.empty(), "pop() called on an empty IndexedPriorityQueue");
        let root = self.heap[0];
        let last = self.heap.pop().unwrap();
        self.position[root as usize] = NOT_QUEUED;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.position[last as usize] = 0;
            self.sift_down(0);
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.key[self.heap[parent] as usize] <= self.key[self.heap[i] as usize] {
                break;
            }
            self.heap.swap(parent, i);
            self.position[self.heap[parent] as usize] = parent;
            self.position[self.heap[i] as usize] = i;
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < self.heap.len()
                && self.key[self.heap[left] as usize] < self.key[self.heap[smallest] as usize]
            {
                smallest = left;
            }
            if right < self.heap.len()
                && self.key[self.heap[right] as usize] < self.key[self.heap[smallest] as usize]
            {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.heap.swap(smallest, i);
            self.position[self.heap[smallest] as usize] = smallest;
            self.position[self.heap[i] as usize] = i;
            i = smallest;
        }
    }
}
