//! OBD-II mode 01 PID catalog: command codes, labels, units, decode formulas.

/// Mode 01 PIDs with built-in decode support.
///
/// `command()` returns the four-digit request string (service + PID) that
/// doubles as the sensor's identity throughout the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardPid {
    EngineLoad,
    CoolantTemp,
    IntakePressure,
    EngineRpm,
    VehicleSpeed,
    IntakeAirTemp,
    MafRate,
    ThrottlePosition,
    FuelLevel,
    ControlModuleVoltage,
}

impl StandardPid {
    /// Every catalog entry, in PID order.
    pub const ALL: [StandardPid; 10] = [
        StandardPid::EngineLoad,
        StandardPid::CoolantTemp,
        StandardPid::IntakePressure,
        StandardPid::EngineRpm,
        StandardPid::VehicleSpeed,
        StandardPid::IntakeAirTemp,
        StandardPid::MafRate,
        StandardPid::ThrottlePosition,
        StandardPid::FuelLevel,
        StandardPid::ControlModuleVoltage,
    ];

    /// The request command string, e.g. `"010C"` for engine RPM.
    pub fn command(&self) -> &'static str {
        match self {
            StandardPid::EngineLoad => "0104",
            StandardPid::CoolantTemp => "0105",
            StandardPid::IntakePressure => "010B",
            StandardPid::EngineRpm => "010C",
            StandardPid::VehicleSpeed => "010D",
            StandardPid::IntakeAirTemp => "010F",
            StandardPid::MafRate => "0110",
            StandardPid::ThrottlePosition => "0111",
            StandardPid::FuelLevel => "012F",
            StandardPid::ControlModuleVoltage => "0142",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StandardPid::EngineLoad => "Calculated engine load",
            StandardPid::CoolantTemp => "Engine coolant temperature",
            StandardPid::IntakePressure => "Intake manifold pressure",
            StandardPid::EngineRpm => "Engine RPM",
            StandardPid::VehicleSpeed => "Vehicle speed",
            StandardPid::IntakeAirTemp => "Intake air temperature",
            StandardPid::MafRate => "MAF air flow rate",
            StandardPid::ThrottlePosition => "Throttle position",
            StandardPid::FuelLevel => "Fuel tank level",
            StandardPid::ControlModuleVoltage => "Control module voltage",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            StandardPid::EngineLoad => "%",
            StandardPid::CoolantTemp => "°C",
            StandardPid::IntakePressure => "kPa",
            StandardPid::EngineRpm => "rpm",
            StandardPid::VehicleSpeed => "km/h",
            StandardPid::IntakeAirTemp => "°C",
            StandardPid::MafRate => "g/s",
            StandardPid::ThrottlePosition => "%",
            StandardPid::FuelLevel => "%",
            StandardPid::ControlModuleVoltage => "V",
        }
    }

    /// Look up a catalog entry by command string. Hex case is ignored.
    pub fn from_command(command: &str) -> Option<Self> {
        let normalized = command.to_ascii_uppercase();
        StandardPid::ALL
            .iter()
            .copied()
            .find(|pid| pid.command() == normalized)
    }

    /// Apply the standard decode formula to a response payload.
    ///
    /// Returns `None` when the payload is shorter than the formula needs.
    pub fn decode(&self, payload: &[u8]) -> Option<f64> {
        let a = f64::from(*payload.first()?);
        match self {
            // A * 100 / 255
            StandardPid::EngineLoad | StandardPid::ThrottlePosition | StandardPid::FuelLevel => {
                Some(a * 100.0 / 255.0)
            }
            // A - 40
            StandardPid::CoolantTemp | StandardPid::IntakeAirTemp => Some(a - 40.0),
            // A
            StandardPid::IntakePressure | StandardPid::VehicleSpeed => Some(a),
            // (256A + B) / 4
            StandardPid::EngineRpm => {
                let b = f64::from(*payload.get(1)?);
                Some((256.0 * a + b) / 4.0)
            }
            // (256A + B) / 100
            StandardPid::MafRate => {
                let b = f64::from(*payload.get(1)?);
                Some((256.0 * a + b) / 100.0)
            }
            // (256A + B) / 1000
            StandardPid::ControlModuleVoltage => {
                let b = f64::from(*payload.get(1)?);
                Some((256.0 * a + b) / 1000.0)
            }
        }
    }
}

impl std::fmt::Display for StandardPid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.command())
    }
}

/// What a [`crate::SensorChannel`] is built from: a command code plus
/// human-readable metadata, optionally backed by a catalog entry so raw
/// response payloads can be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSpec {
    command: String,
    label: String,
    unit: String,
    pid: Option<StandardPid>,
}

impl SensorSpec {
    /// Spec for a catalog PID.
    pub fn standard(pid: StandardPid) -> Self {
        Self {
            command: pid.command().to_string(),
            label: pid.label().to_string(),
            unit: pid.unit().to_string(),
            pid: Some(pid),
        }
    }

    /// Spec for a non-catalog command code (manufacturer extensions and the
    /// like). Custom sensors take values directly; they cannot decode raw
    /// payloads. The command is normalized to uppercase hex.
    pub fn custom(
        command: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        let command = command.into().to_ascii_uppercase();
        let pid = StandardPid::from_command(&command);
        Self {
            command,
            label: label.into(),
            unit: unit.into(),
            pid,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The catalog entry backing this spec, if any.
    pub fn pid(&self) -> Option<StandardPid> {
        self.pid
    }

    /// Decode a raw response payload into an engineering value.
    pub fn decode(&self, payload: &[u8]) -> Option<f64> {
        self.pid.and_then(|pid| pid.decode(payload))
    }
}
