/// Linear undo over whole-value snapshots. Each snapshot is the state as it
/// was immediately before a mutation; undo pops the most recent one.
#[derive(Clone, Debug)]
pub struct UndoHistory<T: Clone> {
    stack: Vec<T>,
}

impl<T: Clone> Default for UndoHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> UndoHistory<T> {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push_snapshot(&mut self, value: T) {
        self.stack.push(value);
    }

    pub fn can_undo(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn undo(&mut self) -> Option<T> {
        self.stack.pop()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}
