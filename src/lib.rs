//! Range-fan construction, unit conversion and line-of-sight
//! orchestration for visibility tooling.
//!
//! The JSON entry points below are what a Python host calls (with the
//! `python` feature enabled): each takes a JSON string and returns a
//! JSON string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod extent;
pub mod offset;
pub mod range_fan;
pub mod types;
pub mod units;
pub mod visibility;

use range_fan::{build_range_fan, RangeFanError, RangeFanSpec};
use units::{convert_distance, DistanceUnit};

#[derive(Debug, Error)]
pub enum JsonApiError {
    #[error("invalid {what} JSON: {source}")]
    Parse {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    RangeFan(#[from] RangeFanError),
    #[error("failed to serialize result: {0}")]
    Serialize(serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceRequest {
    pub from: DistanceUnit,
    pub to: DistanceUnit,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DistanceResponse {
    value: f64,
    unit: DistanceUnit,
}

/// Build a range fan from a JSON `RangeFanSpec`; returns the polygon as JSON.
pub fn range_fan_json(spec_json: &str) -> Result<String, JsonApiError> {
    let spec: RangeFanSpec = serde_json::from_str(spec_json).map_err(|source| JsonApiError::Parse {
        what: "range fan spec",
        source,
    })?;
    let polygon = build_range_fan(&spec)?;
    serde_json::to_string(&polygon).map_err(JsonApiError::Serialize)
}

pub fn distance_json(request_json: &str) -> Result<String, JsonApiError> {
    let req: DistanceRequest = serde_json::from_str(request_json).map_err(|source| JsonApiError::Parse {
        what: "distance request",
        source,
    })?;
    let resp = DistanceResponse {
        value: convert_distance(req.from, req.to, req.value),
        unit: req.to,
    };
    serde_json::to_string(&resp).map_err(JsonApiError::Serialize)
}

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    fn to_py_err(e: super::JsonApiError) -> PyErr {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
    }

    /// Takes a JSON range fan spec and returns the polygon as JSON.
    #[pyfunction]
    fn build_range_fan_json(spec_json: &str) -> PyResult<String> {
        super::range_fan_json(spec_json).map_err(to_py_err)
    }

    #[pyfunction]
    fn convert_distance_json(request_json: &str) -> PyResult<String> {
        super::distance_json(request_json).map_err(to_py_err)
    }

    #[pymodule]
    fn los_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(build_range_fan_json, m)?)?;
        m.add_function(wrap_pyfunction!(convert_distance_json, m)?)?;
        Ok(())
    }
}
