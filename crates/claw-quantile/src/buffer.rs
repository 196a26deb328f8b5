//! Fixed-capacity raw value buffer.

/// An append-only buffer of raw observations with a fixed capacity.
///
/// Callers check [`is_full`](Self::is_full) before pushing; writing past the
/// capacity is a logic error and panics.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    values: Box<[f64]>,
    len: usize,
}

impl SampleBuffer {
    /// Creates an empty buffer holding at most `capacity` values.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Appends a value.
    pub fn push(&mut self, value: f64) {
        self.values[self.len] = value;
        self.len += 1;
    }

    /// Returns the buffered values in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    /// Returns the number of buffered values.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are buffered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` once the buffer has reached its capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.values.len()
    }

    /// Discards all buffered values, keeping the allocation.
    pub fn reset(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buffer = SampleBuffer::new(4);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.capacity(), 4);
        assert!(buffer.as_slice().is_empty());
    }

    #[test]
    fn push_until_full() {
        let mut buffer = SampleBuffer::new(3);
        buffer.push(1.0);
        buffer.push(2.0);
        assert!(!buffer.is_full());
        buffer.push(3.0);

        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut buffer = SampleBuffer::new(2);
        buffer.push(1.0);
        buffer.push(2.0);
        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 2);

        buffer.push(5.0);
        assert_eq!(buffer.as_slice(), &[5.0]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn push_past_capacity_panics() {
        let mut buffer = SampleBuffer::new(1);
        buffer.push(1.0);
        buffer.push(2.0);
    }
}
