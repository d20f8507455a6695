//! Error kinds for the solver pipeline.
//!
//! All errors are fatal: each signals a malformed input or a genuinely
//! ill-posed numerical configuration, never a transient condition.
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;

use nalgebra::Point2;

#[derive(Debug)]
pub enum ConfigurationError {
    /// `run()` was invoked before a parameter set was successfully loaded.
    NotInitialized,
    /// A pipeline phase was invoked out of order.
    PhaseOrder {
        expected: &'static str,
        actual: &'static str,
    },
    /// Degree-of-freedom data was read after a mesh mutation without
    /// redistributing the numbering.
    StaleDofNumbering(&'static str),
    /// A parameter failed validation.
    InvalidParameter { name: &'static str, reason: String },
    /// The configuration file could not be read.
    Read { path: PathBuf, source: io::Error },
    /// The configuration file could not be parsed.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConfigurationError::NotInitialized => {
                write!(f, "The problem was run before its configuration was initialized.")
            }
            ConfigurationError::PhaseOrder { expected, actual } => {
                write!(
                    f,
                    "Pipeline phase invoked out of order: expected state {}, found {}.",
                    expected, actual
                )
            }
            ConfigurationError::StaleDofNumbering(domain) => {
                write!(
                    f,
                    "The {} dof numbering is stale: the mesh was mutated \
                     without a subsequent call to distribute().",
                    domain
                )
            }
            ConfigurationError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}.", name, reason)
            }
            ConfigurationError::Read { path, source } => {
                write!(f, "Failed to read configuration file '{}': {}.", path.display(), source)
            }
            ConfigurationError::Parse { path, source } => {
                write!(f, "Failed to parse configuration file '{}': {}.", path.display(), source)
            }
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigurationError::Read { source, .. } => Some(source),
            ConfigurationError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryValidationError {
    /// The embedded grid is too coarse relative to the host grid.
    EmbeddedTooCoarse {
        embedded_max_diameter: f64,
        host_min_diameter: f64,
    },
    /// A physical point of the embedded geometry lies outside the host mesh.
    PointOutsideHost(Point2<f64>),
}

impl Display for GeometryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            GeometryValidationError::EmbeddedTooCoarse {
                embedded_max_diameter,
                host_min_diameter,
            } => {
                write!(
                    f,
                    "The host grid is too refined (or the embedded grid is too coarse): \
                     embedded maximal cell diameter {} is not smaller than the host minimal \
                     cell diameter {}. Adjust the refinement parameters.",
                    embedded_max_diameter, host_min_diameter
                )
            }
            GeometryValidationError::PointOutsideHost(point) => {
                write!(
                    f,
                    "The embedded geometry maps the point ({}, {}) outside the host domain.",
                    point.x, point.y
                )
            }
        }
    }
}

impl Error for GeometryValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearSolveError {
    /// The direct factorization of the stiffness operator failed.
    FactorizationFailed,
    /// The iterative solver did not converge within the configured
    /// maximum number of steps.
    MaxIterationsReached { iterations: usize },
}

impl Display for LinearSolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LinearSolveError::FactorizationFailed => {
                write!(
                    f,
                    "Direct factorization of the stiffness operator failed: \
                     the matrix is singular or not positive definite."
                )
            }
            LinearSolveError::MaxIterationsReached { iterations } => {
                write!(
                    f,
                    "The Schur complement solver failed to converge within the \
                     maximum number of iterations ({}).",
                    iterations
                )
            }
        }
    }
}

impl Error for LinearSolveError {}

#[derive(Debug)]
pub struct IoError {
    pub path: PathBuf,
    pub message: String,
}

impl Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Failed to export '{}': {}.", self.path.display(), self.message)
    }
}

impl Error for IoError {}

/// Union of the failure modes of a full solver run.
#[derive(Debug)]
pub enum RunError {
    Configuration(ConfigurationError),
    Geometry(GeometryValidationError),
    LinearSolve(LinearSolveError),
    Io(IoError),
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            RunError::Configuration(err) => Display::fmt(err, f),
            RunError::Geometry(err) => Display::fmt(err, f),
            RunError::LinearSolve(err) => Display::fmt(err, f),
            RunError::Io(err) => Display::fmt(err, f),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::Configuration(err) => err.source(),
            RunError::Geometry(_) => None,
            RunError::LinearSolve(_) => None,
            RunError::Io(_) => None,
        }
    }
}

impl From<ConfigurationError> for RunError {
    fn from(err: ConfigurationError) -> Self {
        RunError::Configuration(err)
    }
}

impl From<GeometryValidationError> for RunError {
    fn from(err: GeometryValidationError) -> Self {
        RunError::Geometry(err)
    }
}

impl From<LinearSolveError> for RunError {
    fn from(err: LinearSolveError) -> Self {
        RunError::LinearSolve(err)
    }
}

impl From<IoError> for RunError {
    fn from(err: IoError) -> Self {
        RunError::Io(err)
    }
}
