use crate::models::error::CaptureError;

/// Fixed-capacity circular byte buffer with overwrite-oldest semantics.
///
/// Single-producer/single-consumer within a session: the producer loop
/// owns it while recording, and the drain on stop runs only after the
/// producer has been joined. No internal locking.
///
/// Overflow behavior: a push that would exceed capacity first evicts the
/// oldest bytes, and the evicted count is returned to the caller for
/// accounting.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
    count: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self, CaptureError> {
        if capacity == 0 {
            return Err(CaptureError::CapacityZero);
        }
        Ok(Self {
            storage: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
            count: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes currently readable.
    pub fn available(&self) -> usize {
        self.count
    }

    /// Bytes writable without eviction.
    pub fn free(&self) -> usize {
        self.capacity() - self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append `chunk`, evicting the oldest bytes as needed.
    ///
    /// Returns the number of bytes evicted (`chunk.len() - free()` when
    /// the chunk does not fit, zero otherwise). A chunk longer than the
    /// whole buffer nets out to retaining its trailing `capacity()` bytes;
    /// the count still reflects every displaced byte.
    pub fn push(&mut self, chunk: &[u8]) -> usize {
        if chunk.is_empty() {
            return 0;
        }

        let capacity = self.capacity();
        let evicted = chunk.len().saturating_sub(self.free());

        // Oversized chunks: only the tail can survive.
        let tail = if chunk.len() > capacity {
            &chunk[chunk.len() - capacity..]
        } else {
            chunk
        };

        // Evict stored bytes the tail will displace.
        let displaced = (self.count + tail.len()).saturating_sub(capacity);
        if displaced > 0 {
            self.read_pos = (self.read_pos + displaced) % capacity;
            self.count -= displaced;
        }

        // Copy in, wrapping at the end of storage.
        let first = (capacity - self.write_pos).min(tail.len());
        self.storage[self.write_pos..self.write_pos + first].copy_from_slice(&tail[..first]);
        if tail.len() > first {
            self.storage[..tail.len() - first].copy_from_slice(&tail[first..]);
        }
        self.write_pos = (self.write_pos + tail.len()) % capacity;
        self.count += tail.len();

        evicted
    }

    /// Copy up to `out.len()` bytes, oldest to newest, removing them.
    ///
    /// Returns the number of bytes copied. Draining with
    /// `out.len() >= available()` empties the buffer.
    pub fn drain(&mut self, out: &mut [u8]) -> usize {
        let to_read = out.len().min(self.count);
        if to_read == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = (capacity - self.read_pos).min(to_read);
        out[..first].copy_from_slice(&self.storage[self.read_pos..self.read_pos + first]);
        if to_read > first {
            out[first..to_read].copy_from_slice(&self.storage[..to_read - first]);
        }
        self.read_pos = (self.read_pos + to_read) % capacity;
        self.count -= to_read;

        to_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all(buf: &mut RingBuffer) -> Vec<u8> {
        let mut out = vec![0; buf.available()];
        let n = buf.drain(&mut out);
        assert_eq!(n, out.len());
        out
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(RingBuffer::new(0).unwrap_err(), CaptureError::CapacityZero);
    }

    #[test]
    fn basic_push_drain() {
        let mut buf = RingBuffer::new(10).unwrap();
        assert_eq!(buf.push(&[1, 2, 3]), 0);

        assert_eq!(buf.available(), 3);
        assert_eq!(buf.free(), 7);
        assert_eq!(drain_all(&mut buf), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn push_then_drain_round_trips() {
        let mut buf = RingBuffer::new(64).unwrap();
        let chunk: Vec<u8> = (0..40).collect();
        buf.push(&chunk);

        let mut out = vec![0; 40];
        assert_eq!(buf.drain(&mut out), 40);
        assert_eq!(out, chunk);
    }

    #[test]
    fn drain_partial_preserves_order() {
        let mut buf = RingBuffer::new(10).unwrap();
        buf.push(&[1, 2, 3, 4, 5]);

        let mut first = [0; 3];
        assert_eq!(buf.drain(&mut first), 3);
        assert_eq!(first, [1, 2, 3]);
        assert_eq!(buf.available(), 2);

        // Request more than available.
        let mut rest = [0; 10];
        assert_eq!(buf.drain(&mut rest), 2);
        assert_eq!(&rest[..2], &[4, 5]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_evicts_oldest_and_reports_count() {
        let mut buf = RingBuffer::new(4).unwrap();
        assert_eq!(buf.push(&[1, 2, 3, 4]), 0);
        assert_eq!(buf.push(&[5, 6]), 2); // evicts 1, 2

        assert_eq!(buf.available(), 4);
        assert_eq!(drain_all(&mut buf), vec![3, 4, 5, 6]);
    }

    #[test]
    fn chunk_larger_than_capacity_keeps_tail() {
        let mut buf = RingBuffer::new(3).unwrap();
        buf.push(&[9]);

        // 5 new bytes against 2 free: 3 evicted in total.
        assert_eq!(buf.push(&[1, 2, 3, 4, 5]), 3);
        assert_eq!(buf.available(), 3);
        assert_eq!(drain_all(&mut buf), vec![3, 4, 5]);
    }

    #[test]
    fn wraparound() {
        let mut buf = RingBuffer::new(4).unwrap();
        buf.push(&[1, 2, 3]);
        let mut skip = [0; 2];
        buf.drain(&mut skip); // read_pos = 2

        assert_eq!(buf.push(&[4, 5, 6]), 0); // write wraps
        assert_eq!(buf.available(), 4);
        assert_eq!(drain_all(&mut buf), vec![3, 4, 5, 6]);
    }

    #[test]
    fn sequential_pushes_within_capacity_are_lossless() {
        let mut buf = RingBuffer::new(100).unwrap();
        let stream: Vec<u8> = (0..100).collect();
        for chunk in stream.chunks(7) {
            assert_eq!(buf.push(chunk), 0);
        }
        assert_eq!(buf.available(), 100);
        assert_eq!(drain_all(&mut buf), stream);
    }

    #[test]
    fn retains_most_recent_capacity_bytes() {
        // Capacity 100, three 40-byte chunks: bytes [20..120) survive and
        // 20 bytes are reported evicted.
        let mut buf = RingBuffer::new(100).unwrap();
        let stream: Vec<u8> = (0..120).map(|i| i as u8).collect();

        let mut evicted = 0;
        for chunk in stream.chunks(40) {
            evicted += buf.push(chunk);
        }

        assert_eq!(evicted, 20);
        assert_eq!(buf.available(), 100);
        assert_eq!(drain_all(&mut buf), stream[20..].to_vec());
    }

    #[test]
    fn empty_operations() {
        let mut buf = RingBuffer::new(10).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.push(&[]), 0);

        let mut out = [0; 5];
        assert_eq!(buf.drain(&mut out), 0);
    }
}
