/// Searches a range of numbers (eg block numbers) for the point at which some state
/// (eg the spec version) changes, given the state at each end of the range. The state
/// is assumed to change at most once between two probes that agree with the low end.
#[derive(Debug)]
pub struct BinaryChopper<N, T> {
    low: (N, T),
    high: (N, T),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Step<N, T> {
    /// Look up the state at this number and hand it to [`BinaryChopper::record`].
    Probe(N),
    /// The range is narrowed down to two adjacent numbers (or one, if it started that way).
    Done { before: (N, T), after: (N, T) },
}

impl<N: ChopNumber, T: PartialEq + Clone> BinaryChopper<N, T> {
    pub fn new(low: (N, T), high: (N, T)) -> Self {
        Self { low, high }
    }

    /// What to do next: probe another number, or stop because the change is found.
    pub fn step(&self) -> Step<N, T> {
        if self.low.0.is_adjacent_or_equal(self.high.0) {
            Step::Done {
                before: self.low.clone(),
                after: self.high.clone(),
            }
        } else {
            Step::Probe(self.mid())
        }
    }

    /// Record the state at the number last given by [`Step::Probe`]. Matching the low end
    /// moves the search up, anything else moves it down.
    pub fn record(&mut self, state: T) {
        let mid = self.mid();
        if state == self.low.1 {
            self.low = (mid, state);
        } else {
            self.high = (mid, state);
        }
    }

    fn mid(&self) -> N {
        self.low.0.midpoint(self.high.0)
    }
}

/// The numbers we can chop over.
pub trait ChopNumber: std::fmt::Debug + Copy + PartialEq {
    fn is_adjacent_or_equal(self, higher: Self) -> bool;
    fn midpoint(self, higher: Self) -> Self;
}

macro_rules! impl_chop_number {
    ($($ty:ty),*) => {$(
        impl ChopNumber for $ty {
            fn is_adjacent_or_equal(self, higher: Self) -> bool {
                higher.saturating_sub(self) <= 1
            }
            fn midpoint(self, higher: Self) -> Self {
                self + (higher - self) / 2
            }
        }
    )*}
}

impl_chop_number!(u32, u64, usize);
