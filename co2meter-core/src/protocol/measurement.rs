use super::frame::DecodedFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    Co2 = 0x50,
    Temperature = 0x42,
}

impl TryFrom<u8> for MeasurementKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x50 => Ok(MeasurementKind::Co2),
            0x42 => Ok(MeasurementKind::Temperature),
            _ => Err(value),
        }
    }
}

/// A single reading carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    /// CO2 concentration in ppm.
    Co2 { ppm: u16 },
    /// Temperature in Kelvin * 16.
    Temperature { raw: u16 },
}

impl Measurement {
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Co2 { .. } => MeasurementKind::Co2,
            Measurement::Temperature { .. } => MeasurementKind::Temperature,
        }
    }
}

/// Interpret a frame as a measurement. Frames of any other kind yield `None`.
pub fn extract(frame: &DecodedFrame) -> Option<Measurement> {
    let value = frame.value();
    match MeasurementKind::try_from(frame.kind()).ok()? {
        MeasurementKind::Co2 => Some(Measurement::Co2 { ppm: value }),
        MeasurementKind::Temperature => Some(Measurement::Temperature { raw: value }),
    }
}

/// Convert Kelvin * 16 to degrees Celsius, rounded to two decimals.
pub fn kelvin16_to_celsius(raw: u16) -> f64 {
    ((f64::from(raw) / 16.0 - 273.15) * 100.0).round() / 100.0
}
