/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            _ => Err(ValidationError::UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    pub const fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// Parse the textual form used by the plain-text update path.
    pub fn parse(kind: MetricKind, s: &str) -> Result<Self, ValidationError> {
        let value = match kind {
            MetricKind::Gauge => {
                let v = f64::from_str(s).map_err(|_| ValidationError::InvalidNumber {
                    kind,
                    raw: s.to_string(),
                })?;
                MetricValue::Gauge(v)
            }
            MetricKind::Counter => {
                let v = i64::from_str(s).map_err(|_| ValidationError::InvalidNumber {
                    kind,
                    raw: s.to_string(),
                })?;
                MetricValue::Counter(v)
            }
        };
        value.check()?;
        Ok(value)
    }

    /// Negative readings are rejected, zero is accepted.
    pub fn check(&self) -> Result<(), ValidationError> {
        match *self {
            MetricValue::Gauge(v) => {
                if !v.is_finite() {
                    Err(ValidationError::NonFiniteValue)
                } else if v < 0.0 {
                    Err(ValidationError::NegativeValue(v))
                } else {
                    Ok(())
                }
            }
            MetricValue::Counter(d) => {
                if d < 0 {
                    Err(ValidationError::NegativeDelta(d))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(v) => write!(f, "{v}"),
            MetricValue::Counter(d) => write!(f, "{d}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn gauge<S: Into<String>>(name: S, value: f64) -> Self {
        Metric {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn counter<S: Into<String>>(name: S, delta: i64) -> Self {
        Metric {
            name: name.into(),
            value: MetricValue::Counter(delta),
        }
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.value.check()
    }
}
