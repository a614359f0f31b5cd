use std::fmt;

/// The state mutation after which a non-finite value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    TransportSweep,
    VelocityUpdate,
    PositionUpdate,
    DensityUpdate,
    EquationOfState,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::TransportSweep => "transport sweep",
            Phase::VelocityUpdate => "velocity update",
            Phase::PositionUpdate => "position update",
            Phase::DensityUpdate => "density update",
            Phase::EquationOfState => "pressure-energy iteration",
        };
        f.write_str(name)
    }
}

/// Zone-indexed context for a NaN or infinite field value.
#[derive(Debug, Clone, PartialEq)]
pub struct NonFiniteReport {
    pub phase: Phase,
    pub field: &'static str,
    pub index: usize,
    pub time: f64,
    pub value: f64,
    pub neighbors: (Option<f64>, Option<f64>),
}

impl fmt::Display for NonFiniteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:e}"));
        write!(
            f,
            "non-finite {} = {} at index {} (t = {} μs) after {}; neighbors [{}, {}]",
            self.field,
            self.value,
            self.index,
            self.time,
            self.phase,
            show(self.neighbors.0),
            show(self.neighbors.1),
        )
    }
}

/// Scans `values` and reports the first entry that is NaN or infinite.
pub fn check_finite(
    values: &[f64],
    phase: Phase,
    field: &'static str,
    time: f64,
) -> Result<(), NonFiniteReport> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(index) => Err(NonFiniteReport {
            phase,
            field,
            index,
            time,
            value: values[index],
            neighbors: (
                index.checked_sub(1).map(|i| values[i]),
                values.get(index + 1).copied(),
            ),
        }),
    }
}

/// Counts repeated warnings so that only the first `limit` are logged loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningThrottle {
    count: usize,
    limit: usize,
}

impl WarningThrottle {
    pub const fn new(limit: usize) -> Self {
        Self { count: 0, limit }
    }

    /// Records one occurrence; returns true while the occurrence should still be logged.
    pub fn record(&mut self) -> bool {
        self.count += 1;
        self.count <= self.limit
    }

    /// Occurrences recorded beyond the logged ones.
    pub fn suppressed(&self) -> usize {
        self.count.saturating_sub(self.limit)
    }
}
