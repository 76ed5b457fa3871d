//! Fixed-capacity arenas that lend out entity records for one slow tick.
//!
//! Every cell is allocated once at startup. `reset` rewinds the cursor and
//! bumps the generation, so handles issued before the reset stop resolving
//! instead of silently pointing at whatever the next tick wrote there.

/// Generational index into an [`ObjectPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
pub struct ObjectPool<T> {
    label: &'static str,
    cells: Vec<T>,
    used: usize,
    generation: u32,
    exhausted_logged: bool,
}

impl<T: Default> ObjectPool<T> {
    pub fn with_capacity(label: &'static str, capacity: usize) -> Self {
        let mut cells = Vec::with_capacity(capacity);
        cells.resize_with(capacity, T::default);
        Self {
            label,
            cells,
            used: 0,
            generation: 0,
            exhausted_logged: false,
        }
    }

    /// Rewinds the pool. Handles from the previous generation become stale.
    pub fn reset(&mut self) {
        self.used = 0;
        self.generation = self.generation.wrapping_add(1);
        self.exhausted_logged = false;
    }

    /// Lends out the next cell. The cell still holds last tick's contents, so
    /// callers overwrite every field; owned buffers keep their allocation.
    pub fn acquire(&mut self) -> Option<(PoolHandle, &mut T)> {
        if self.used >= self.cells.len() {
            if !self.exhausted_logged {
                log::warn!(
                    "{} pool exhausted at {} entries; dropping the rest of this tick",
                    self.label,
                    self.cells.len()
                );
                self.exhausted_logged = true;
            }
            return None;
        }
        let index = self.used;
        self.used += 1;
        let handle = PoolHandle {
            index: index as u32,
            generation: self.generation,
        };
        Some((handle, &mut self.cells[index]))
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if self.is_live(handle) {
            self.cells.get(handle.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.is_live(handle) {
            self.cells.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Cells handed out since the last reset, in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        let generation = self.generation;
        self.cells[..self.used]
            .iter()
            .enumerate()
            .map(move |(index, cell)| {
                (
                    PoolHandle {
                        index: index as u32,
                        generation,
                    },
                    cell,
                )
            })
    }

    fn is_live(&self, handle: PoolHandle) -> bool {
        handle.generation == self.generation && handle.index() < self.used
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn available(&self) -> usize {
        self.cells.len() - self.used
    }
}
