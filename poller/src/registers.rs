use crate::reading::Measurement;

/// A run of consecutive input registers holding one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterGroup {
    pub address: u16,
    pub count: u16,
}

impl RegisterGroup {
    /// A 32-bit float spread over two registers.
    pub const fn float32(address: u16) -> Self {
        Self { address, count: 2 }
    }
}

/// Register layout of a meter model, indexed by measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    groups: [RegisterGroup; 5],
}

impl RegisterMap {
    pub const fn new(
        voltage: RegisterGroup,
        current: RegisterGroup,
        power: RegisterGroup,
        frequency: RegisterGroup,
        energy: RegisterGroup,
    ) -> Self {
        Self {
            groups: [voltage, current, power, frequency, energy],
        }
    }

    pub fn group(&self, measurement: Measurement) -> RegisterGroup {
        self.groups[measurement.index()]
    }
}

/// Eastron SDM630 phase-1 voltage, current, power, frequency and total import energy.
pub const SDM630: RegisterMap = RegisterMap::new(
    RegisterGroup::float32(0),
    RegisterGroup::float32(6),
    RegisterGroup::float32(12),
    RegisterGroup::float32(70),
    RegisterGroup::float32(342),
);
