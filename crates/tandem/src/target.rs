//! Append-only output sinks for the printer engine.
//!
//! A [`Target`] collects printed output and supports checkpoint/rollback so
//! the printer's `or_else` can discard a failed branch's partial output.
//! Checkpoints form a LIFO stack: every checkpoint taken must be resolved by
//! exactly one `rollback` or `commit` before its enclosing frame exits.

/// An append-only sink over output elements of type `O`.
pub trait Target<O> {
    /// An opaque handle marking a point in the output.
    type Checkpoint;

    /// Append one element.
    fn write(&mut self, value: O);

    /// Mark the current output position.
    fn checkpoint(&mut self) -> Self::Checkpoint;

    /// Discard everything appended since the checkpoint.
    fn rollback(&mut self, checkpoint: Self::Checkpoint);

    /// Drop the checkpoint, keeping the output appended since.
    fn commit(&mut self, checkpoint: Self::Checkpoint);
}

/// A [`Target`] collecting elements into a chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkTarget<O> {
    buffer: Vec<O>,
}

impl<O> ChunkTarget<O> {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Finalise into the collected chunk.
    pub fn finish(self) -> Vec<O> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl ChunkTarget<char> {
    /// Finalise into a string; the concatenation happens here, not per write.
    pub fn finish_string(self) -> String {
        self.buffer.into_iter().collect()
    }
}

impl<O> Target<O> for ChunkTarget<O> {
    // A checkpoint is the buffer length at the time it was taken; rollback is
    // a truncate.
    type Checkpoint = usize;

    #[inline]
    fn write(&mut self, value: O) {
        self.buffer.push(value);
    }

    fn checkpoint(&mut self) -> usize {
        self.buffer.len()
    }

    fn rollback(&mut self, checkpoint: usize) {
        self.buffer.truncate(checkpoint);
    }

    fn commit(&mut self, _checkpoint: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_finish() {
        let mut target = ChunkTarget::new();
        target.write('a');
        target.write('b');
        assert_eq!(target.finish_string(), "ab");
    }

    #[test]
    fn rollback_discards_since_checkpoint() {
        let mut target = ChunkTarget::new();
        target.write('a');
        let cp = target.checkpoint();
        target.write('b');
        target.write('c');
        target.rollback(cp);
        target.write('d');
        assert_eq!(target.finish_string(), "ad");
    }

    #[test]
    fn commit_keeps_output() {
        let mut target = ChunkTarget::new();
        let cp = target.checkpoint();
        target.write('x');
        target.commit(cp);
        assert_eq!(target.finish_string(), "x");
    }

    #[test]
    fn nested_checkpoints_are_lifo() {
        let mut target = ChunkTarget::new();
        target.write('a');
        let outer = target.checkpoint();
        target.write('b');
        let inner = target.checkpoint();
        target.write('c');
        target.rollback(inner);
        target.write('d');
        target.rollback(outer);
        assert_eq!(target.finish_string(), "a");
    }

    #[test]
    fn generic_elements() {
        let mut target: ChunkTarget<u32> = ChunkTarget::new();
        target.write(1);
        let cp = target.checkpoint();
        target.write(2);
        target.rollback(cp);
        assert_eq!(target.finish(), vec![1]);
    }
}
