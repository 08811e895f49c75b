//! Python bindings.
//!
//! Exposes an in-memory `TrackingEngine` to Python. Results come back as
//! plain dicts.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::config::EngineConfig;
use crate::engine;
use crate::geofence::Verdict;
use crate::models::{Position, PositionInput, Vehicle};
use crate::ratelimit::RateLimitStatus;
use crate::validation::validate_position;

#[pyclass(name = "TrackingEngine")]
struct PyTrackingEngine {
    inner: engine::TrackingEngine,
}

#[pymethods]
impl PyTrackingEngine {
    /// Build an engine over in-memory stores. `config_json` overrides defaults.
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        crate::init_logger();
        let config = match config_json {
            Some(json) => EngineConfig::from_json_str(json)
                .map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => EngineConfig::default(),
        };
        let (inner, _) = engine::TrackingEngine::in_memory(config);
        Ok(Self { inner })
    }

    #[pyo3(signature = (vehicle_id, tag, owner_user_id=None))]
    fn register_vehicle(
        &self,
        vehicle_id: &str,
        tag: &str,
        owner_user_id: Option<&str>,
    ) -> PyResult<()> {
        let mut vehicle = Vehicle::new(vehicle_id, tag);
        if let Some(owner) = owner_user_id {
            vehicle = vehicle.with_owner(owner);
        }
        self.inner
            .register_vehicle(vehicle)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Ingest one report given as a JSON object.
    fn ingest(&self, py: Python<'_>, vehicle_id: &str, position_json: &str) -> PyResult<Py<PyAny>> {
        let input: PositionInput = serde_json::from_str(position_json)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let outcome = self.inner.ingest(vehicle_id, &input);

        let result = PyDict::new(py);
        result.set_item("vehicle_id", &outcome.vehicle_id)?;
        result.set_item("accepted", outcome.accepted)?;
        if let Some(reason) = &outcome.rejection_reason {
            result.set_item("reason", reason)?;
        }
        result.set_item("sequence", outcome.sequence)?;
        result.set_item("violations", outcome.violations.len())?;
        let degraded: Vec<&str> = outcome.degraded.iter().map(|s| s.as_str()).collect();
        result.set_item("degraded", degraded)?;
        Ok(result.into())
    }

    /// Evaluate a point against the active fences without recording anything.
    #[pyo3(signature = (latitude, longitude, altitude_meters=None))]
    fn check_point(
        &self,
        py: Python<'_>,
        latitude: f64,
        longitude: f64,
        altitude_meters: Option<f64>,
    ) -> PyResult<Py<PyAny>> {
        let mut input = PositionInput::new(latitude, longitude);
        input.altitude_meters = altitude_meters;
        let position: Position = validate_position(&input, chrono::Utc::now())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        let verdicts = self
            .inner
            .check_point(&position)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;

        let list = PyList::empty(py);
        for verdict in &verdicts {
            list.append(verdict_dict(py, verdict)?)?;
        }
        Ok(list.into())
    }

    #[pyo3(signature = (identifier, role=None))]
    fn allow(&self, identifier: &str, role: Option<&str>) -> bool {
        self.inner.allow(identifier, role)
    }

    #[pyo3(signature = (identifier, role=None))]
    fn rate_limit_status(
        &self,
        py: Python<'_>,
        identifier: &str,
        role: Option<&str>,
    ) -> PyResult<Py<PyAny>> {
        status_dict(py, &self.inner.status(identifier, role))
    }
}

fn verdict_dict<'py>(py: Python<'py>, verdict: &Verdict) -> PyResult<&'py PyDict> {
    let dict = PyDict::new(py);
    dict.set_item("geofence_id", verdict.fence.id.to_string())?;
    dict.set_item("name", &verdict.fence.name)?;
    dict.set_item("boundary_type", verdict.fence.boundary_type.as_str())?;
    dict.set_item("priority_level", verdict.fence.priority_level)?;
    dict.set_item("is_inside", verdict.is_inside)?;
    dict.set_item("altitude_violation", verdict.altitude_violation)?;
    dict.set_item("is_violation", verdict.is_violation)?;
    Ok(dict)
}

fn status_dict(py: Python<'_>, status: &RateLimitStatus) -> PyResult<Py<PyAny>> {
    let dict = PyDict::new(py);
    dict.set_item("limit", status.limit)?;
    dict.set_item("remaining", status.remaining)?;
    dict.set_item("reset_at", status.reset_at.to_rfc3339())?;
    Ok(dict.into())
}

/// Python module definition
#[pymodule]
fn fleetwatch_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyTrackingEngine>()?;
    Ok(())
}
