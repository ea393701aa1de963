use std::cell::Cell;
use std::fmt;

/// Fixed-address argument storage for the buffer calling strategy.
///
/// The storage is allocated once and never reallocated; moving a `PinnedBuffer`
/// moves only the owning pointer, not the `f64` slots. Compiled caller shims
/// load from [`PinnedBuffer::addr`] directly.
pub struct PinnedBuffer {
    slots: Box<[Cell<f64>]>,
}

impl PinnedBuffer {
    pub(crate) fn new(len: usize) -> Self {
        // Seeded with 1.0, 2.0, ... until the first write.
        let slots = (0..len).map(|i| Cell::new((i + 1) as f64)).collect::<Vec<_>>().into_boxed_slice();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Address of slot 0. Slot `i` lives at `addr() + 8 * i`.
    pub fn addr(&self) -> usize {
        self.slots.as_ptr() as usize
    }

    /// Overwrite the slots in place. `args.len()` must equal `len()`.
    pub(crate) fn write(&self, args: &[f64]) {
        debug_assert_eq!(args.len(), self.slots.len());
        for (slot, v) in self.slots.iter().zip(args) {
            slot.set(*v);
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.slots.iter().map(Cell::get).collect()
    }
}

impl fmt::Debug for PinnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedBuffer")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("values", &self.values())
            .finish()
    }
}
