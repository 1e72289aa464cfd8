use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Read access to a flat buffer of f32 elements.
///
/// Implemented for host slices and for shared cell buffers, so the same
/// matrix view code addresses host memory, device memory and group scratch.
pub trait ReadElements: Sync {
    /// Number of addressable elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the element at `index`.
    fn read(&self, index: usize) -> f32;
}

/// Write access through a shared reference.
///
/// Concurrent writers must target disjoint indices; ordering between
/// writers and readers is established externally (thread join or barrier).
pub trait WriteElements: ReadElements {
    fn write(&self, index: usize, value: f32);
}

impl ReadElements for [f32] {
    fn len(&self) -> usize {
        <[f32]>::len(self)
    }

    #[inline]
    fn read(&self, index: usize) -> f32 {
        self[index]
    }
}

impl ReadElements for Vec<f32> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn read(&self, index: usize) -> f32 {
        self[index]
    }
}

/// An f32 slot that many threads may load and store through `&self`.
///
/// Stored as raw bits in an `AtomicU32` with relaxed ordering. Visibility
/// across threads is the caller's business (barriers, joins).
#[derive(Default)]
#[repr(transparent)]
pub struct F32Cell(AtomicU32);

impl F32Cell {
    pub fn new(value: f32) -> Self {
        F32Cell(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn into_inner(self) -> f32 {
        f32::from_bits(self.0.into_inner())
    }
}

impl Clone for F32Cell {
    fn clone(&self) -> Self {
        F32Cell::new(self.load())
    }
}

impl From<f32> for F32Cell {
    fn from(value: f32) -> Self {
        F32Cell::new(value)
    }
}

impl fmt::Debug for F32Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(), f)
    }
}

impl ReadElements for [F32Cell] {
    fn len(&self) -> usize {
        <[F32Cell]>::len(self)
    }

    #[inline]
    fn read(&self, index: usize) -> f32 {
        self[index].load()
    }
}

impl WriteElements for [F32Cell] {
    #[inline]
    fn write(&self, index: usize, value: f32) {
        self[index].store(value);
    }
}

/// Allocate `n` zero-initialized cells.
pub fn zeroed_cells(n: usize) -> Box<[F32Cell]> {
    (0..n).map(|_| F32Cell::default()).collect()
}
