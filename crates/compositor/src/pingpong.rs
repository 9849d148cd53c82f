/// One of the two paint buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintSlot {
    A,
    B,
}

impl PaintSlot {
    pub fn index(self) -> usize {
        match self {
            PaintSlot::A => 0,
            PaintSlot::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            PaintSlot::A => PaintSlot::B,
            PaintSlot::B => PaintSlot::A,
        }
    }
}

/// Roles of the two paint buffers for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintSlots {
    /// Last frame's output.
    pub read: PaintSlot,
    /// This frame's output.
    pub write: PaintSlot,
}

/// Tracks which paint buffer is written this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPong {
    write: PaintSlot,
}

impl Default for PingPong {
    fn default() -> Self {
        Self {
            write: PaintSlot::A,
        }
    }
}

impl PingPong {
    pub fn slots(&self) -> PaintSlots {
        PaintSlots {
            read: self.write.other(),
            write: self.write,
        }
    }

    /// Flips roles; called exactly once after each presented frame.
    pub fn swap(&mut self) {
        self.write = self.write.other();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Borrows the read buffer immutably and the write buffer mutably.
pub fn split_pair<T>(pair: &mut [T; 2], slots: PaintSlots) -> (&T, &mut T) {
    let (first, second) = pair.split_at_mut(1);
    match slots.write {
        PaintSlot::A => (&second[0], &mut first[0]),
        PaintSlot::B => (&first[0], &mut second[0]),
    }
}
