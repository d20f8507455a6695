//! Run configuration.
//!
//! `Parameters` is a plain value type populated by a structured JSON loader;
//! nothing registers itself anywhere at construction time. The `initialized`
//! flag is set only after a parameter file has been read, parsed and
//! validated, and `run()` fails fast while it is unset.
use std::fs;
use std::path::Path;

use log::LevelFilter;
use serde::Deserialize;

use crate::deformation::DeformationKind;
use crate::error::ConfigurationError;
use crate::solver::SolverControl;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Uniform refinements applied to the host mesh at creation.
    pub initial_refinement: usize,
    /// Uniform refinements applied to the embedded mesh at creation.
    pub initial_embedded_refinement: usize,
    /// Iterations of geometry-driven local refinement of the host mesh.
    pub delta_refinement: usize,
    /// Host boundary ids receiving a homogeneous Dirichlet value
    /// (0 left, 1 right, 2 bottom, 3 top).
    pub homogeneous_dirichlet_ids: Vec<u8>,
    /// Polynomial degree of the host space.
    pub fe_degree: usize,
    /// Polynomial degree of the embedded space.
    pub embedded_fe_degree: usize,
    /// Polynomial degree of the deformation space.
    pub deformation_fe_degree: usize,
    /// Number of Gauss points per embedded cell in the coupling integral.
    pub coupling_quadrature_order: usize,
    /// Interpret the deformation field as a displacement added to the
    /// reference embedding instead of an absolute position.
    pub use_displacement: bool,
    /// Diagnostic verbosity: 0 silent, 1 info, 2 debug, 3 and up trace.
    pub verbosity: u8,
    /// Components of the embedded configuration, as semicolon-separated
    /// expressions in the parameter `t`.
    pub embedded_configuration_expression: String,
    /// Target value enforced on the embedded domain, as an expression in the
    /// physical coordinates `x`, `y`.
    pub embedded_value_expression: String,
    /// Stopping criteria of the Schur-complement solver.
    pub schur_solver_control: SolverControl,
    /// Set by the loader after successful parsing and validation; never part
    /// of the configuration file itself.
    #[serde(skip)]
    pub initialized: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            initial_refinement: 4,
            initial_embedded_refinement: 5,
            delta_refinement: 0,
            homogeneous_dirichlet_ids: vec![0, 1, 2, 3],
            fe_degree: 1,
            embedded_fe_degree: 1,
            deformation_fe_degree: 1,
            coupling_quadrature_order: 3,
            use_displacement: false,
            verbosity: 1,
            embedded_configuration_expression: "0.3*cos(2*pi*t)+0.4; 0.3*sin(2*pi*t)+0.4".to_string(),
            embedded_value_expression: "1".to_string(),
            schur_solver_control: SolverControl::default(),
            initialized: false,
        }
    }
}

impl Parameters {
    /// Loads, validates and marks a parameter set as initialized.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut parameters: Parameters =
            serde_json::from_str(&contents).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        parameters.validate()?;
        parameters.initialized = true;
        Ok(parameters)
    }

    /// Validates every parameter, without touching the `initialized` flag.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let degree_check = |name: &'static str, degree: usize| {
            if degree < 1 {
                Err(ConfigurationError::InvalidParameter {
                    name,
                    reason: format!("finite element degree must be at least 1, got {}", degree),
                })
            } else {
                Ok(())
            }
        };
        degree_check("fe_degree", self.fe_degree)?;
        degree_check("embedded_fe_degree", self.embedded_fe_degree)?;
        degree_check("deformation_fe_degree", self.deformation_fe_degree)?;

        if self.coupling_quadrature_order < 1 {
            return Err(ConfigurationError::InvalidParameter {
                name: "coupling_quadrature_order",
                reason: "at least one quadrature point is required".to_string(),
            });
        }
        if let Some(&id) = self.homogeneous_dirichlet_ids.iter().find(|&&id| id > 3) {
            return Err(ConfigurationError::InvalidParameter {
                name: "homogeneous_dirichlet_ids",
                reason: format!("the unit square has boundary ids 0 to 3, got {}", id),
            });
        }
        if self.schur_solver_control.max_steps == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "schur_solver_control",
                reason: "max_steps must be positive".to_string(),
            });
        }
        if !(self.schur_solver_control.tolerance > 0.0) || !(self.schur_solver_control.reduction > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "schur_solver_control",
                reason: "tolerance and reduction must be positive".to_string(),
            });
        }
        if self.embedded_configuration_expression.trim().is_empty() {
            return Err(ConfigurationError::InvalidParameter {
                name: "embedded_configuration_expression",
                reason: "expression must not be empty".to_string(),
            });
        }
        if self.embedded_value_expression.trim().is_empty() {
            return Err(ConfigurationError::InvalidParameter {
                name: "embedded_value_expression",
                reason: "expression must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn deformation_kind(&self) -> DeformationKind {
        if self.use_displacement {
            DeformationKind::Displacement
        } else {
            DeformationKind::AbsolutePosition
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Off,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
