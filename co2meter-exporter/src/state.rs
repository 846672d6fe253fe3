use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use co2meter_core::{Measurement, kelvin16_to_celsius};

/// Latest readings reported by the meter.
///
/// Written by the poll loop only, read by the metrics endpoint and the
/// periodic reporter. Each field is updated independently; a reader may see
/// a fresh CO2 value next to a stale temperature.
pub struct EnvironmentState {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    co2: AtomicU16,
    /// Bit pattern of an `f64`, degrees Celsius.
    temperature: AtomicU64,
}

/// Values of both fields, read one after the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSnapshot {
    pub co2: u16,
    pub temperature: f64,
}

impl EnvironmentState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    /// Latest CO2 concentration in ppm, 0 until the first reading.
    pub fn co2(&self) -> u16 {
        self.inner.co2.load(Ordering::Acquire)
    }

    pub fn set_co2(&self, ppm: u16) {
        self.inner.co2.store(ppm, Ordering::Release);
    }

    /// Latest temperature in degrees Celsius, 0.0 until the first reading.
    pub fn temperature(&self) -> f64 {
        f64::from_bits(self.inner.temperature.load(Ordering::Acquire))
    }

    pub fn set_temperature(&self, celsius: f64) {
        self.inner
            .temperature
            .store(celsius.to_bits(), Ordering::Release);
    }

    /// Store a measurement in the field matching its kind.
    pub fn record(&self, measurement: Measurement) {
        match measurement {
            Measurement::Co2 { ppm } => self.set_co2(ppm),
            Measurement::Temperature { raw } => self.set_temperature(kelvin16_to_celsius(raw)),
        }
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            co2: self.co2(),
            temperature: self.temperature(),
        }
    }
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EnvironmentState {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
