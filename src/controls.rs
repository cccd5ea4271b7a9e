/// The four drive signals a vehicle reacts to each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub forward: bool,
    pub left: bool,
    pub right: bool,
    pub reverse: bool,
}

impl Controls {
    /// Scripted traffic only ever holds the accelerator
    pub fn forward_only() -> Self {
        Self {
            forward: true,
            ..Self::default()
        }
    }

    /// Interprets network outputs ordered (forward, left, right, reverse)
    pub fn from_outputs(outputs: &[f32]) -> Self {
        let signal = |i: usize| outputs.get(i).is_some_and(|&v| v != 0.0);
        Self {
            forward: signal(0),
            left: signal(1),
            right: signal(2),
            reverse: signal(3),
        }
    }
}

/// Live source of human steering input
pub trait InputSource {
    fn controls(&self) -> Controls;
}

/// A snapshot of held keys is itself an input source
impl InputSource for Controls {
    fn controls(&self) -> Controls {
        *self
    }
}

/// Input source with nothing held, for runs without a human driver
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn controls(&self) -> Controls {
        Controls::default()
    }
}
