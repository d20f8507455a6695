//! The distributed Lagrange multiplier problem pipeline.
use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::info;
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

use crate::adapt::{refine_around_embedded, validate_geometry};
use crate::assembly::coupling::CouplingAssembler;
use crate::assembly::stiffness::assemble_stiffness;
use crate::assembly::target::{assemble_target_rhs, interpolate_target};
use crate::config::Parameters;
use crate::constraints::{make_hanging_node_constraints, make_zero_dirichlet_constraints, ConstraintSet};
use crate::deformation::DeformationMap;
use crate::error::{ConfigurationError, RunError};
use crate::function::{ParsedCurveFunction, ParsedScalarFunction};
use crate::geometry::CellLocator;
use crate::io::vtk::FieldDataSetBuilder;
use crate::mesh::procedural::{create_unit_interval_mesh, create_unit_square_quad_mesh};
use crate::solver::{solve_cg, spmv, FactorizedStiffness, SchurComplement};
use crate::space::{EmbeddedSpace, HostSpace};

/// Phases of a run. Every phase requires the preceding state; out-of-order
/// calls fail fast with a [`ConfigurationError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunState {
    Unconfigured,
    GridReady,
    CouplingReady,
    Assembled,
    Solved,
    Exported,
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::Unconfigured => "Unconfigured",
            RunState::GridReady => "GridReady",
            RunState::CouplingReady => "CouplingReady",
            RunState::Assembled => "Assembled",
            RunState::Solved => "Solved",
            RunState::Exported => "Exported",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A constrained Poisson problem on the unit square with a target value
/// enforced on an immersed curve through a distributed Lagrange multiplier.
pub struct DistributedLagrangeProblem {
    parameters: Parameters,
    state: RunState,

    configuration_function: ParsedCurveFunction,
    value_function: ParsedScalarFunction,

    host: Option<HostSpace>,
    embedded: Option<EmbeddedSpace>,
    mapper: Option<DeformationMap>,
    constraints: Option<ConstraintSet>,
    locator: Option<CellLocator>,

    coupling_pattern: Option<SparsityPattern>,
    stiffness: Option<CsrMatrix<f64>>,
    coupling: Option<CsrMatrix<f64>>,
    target_rhs: Option<DVector<f64>>,
    target_values: Option<DVector<f64>>,

    solution: Option<DVector<f64>>,
    multiplier: Option<DVector<f64>>,
    cg_iterations: usize,
}

impl DistributedLagrangeProblem {
    /// Creates a problem from a validated parameter set, compiling the
    /// configured expressions.
    pub fn new(parameters: Parameters) -> Result<Self, ConfigurationError> {
        if !parameters.initialized {
            return Err(ConfigurationError::NotInitialized);
        }
        parameters.validate()?;
        let configuration_function = ParsedCurveFunction::parse(
            "embedded_configuration_expression",
            &parameters.embedded_configuration_expression,
        )?;
        let value_function =
            ParsedScalarFunction::parse("embedded_value_expression", &parameters.embedded_value_expression)?;
        Ok(Self {
            parameters,
            state: RunState::Unconfigured,
            configuration_function,
            value_function,
            host: None,
            embedded: None,
            mapper: None,
            constraints: None,
            locator: None,
            coupling_pattern: None,
            stiffness: None,
            coupling: None,
            target_rhs: None,
            target_values: None,
            solution: None,
            multiplier: None,
            cg_iterations: 0,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn host(&self) -> Option<&HostSpace> {
        self.host.as_ref()
    }

    pub fn embedded(&self) -> Option<&EmbeddedSpace> {
        self.embedded.as_ref()
    }

    pub fn coupling(&self) -> Option<&CsrMatrix<f64>> {
        self.coupling.as_ref()
    }

    pub fn stiffness(&self) -> Option<&CsrMatrix<f64>> {
        self.stiffness.as_ref()
    }

    pub fn solution(&self) -> Option<&DVector<f64>> {
        self.solution.as_ref()
    }

    pub fn multiplier(&self) -> Option<&DVector<f64>> {
        self.multiplier.as_ref()
    }

    pub fn cg_iterations(&self) -> usize {
        self.cg_iterations
    }

    fn expect_state(&self, expected: RunState) -> Result<(), ConfigurationError> {
        if self.state != expected {
            return Err(ConfigurationError::PhaseOrder {
                expected: expected.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }

    /// Executes the full pipeline:
    /// grids → coupling → assembly → solve → export.
    pub fn run(&mut self) -> Result<(), RunError> {
        if !self.parameters.initialized {
            return Err(ConfigurationError::NotInitialized.into());
        }
        self.setup_grids()?;
        self.setup_coupling()?;
        self.assemble_system()?;
        self.solve()?;
        self.output()?;
        Ok(())
    }

    /// Builds both discretization contexts, the deformation map, runs the
    /// adaptive refinement loop and validates the grid geometry.
    pub fn setup_grids(&mut self) -> Result<(), RunError> {
        self.expect_state(RunState::Unconfigured)?;
        let timer = Instant::now();

        let mut host = HostSpace::from_mesh(
            create_unit_square_quad_mesh(self.parameters.initial_refinement),
            self.parameters.fe_degree,
        )?;
        host.distribute();

        let embedded_mesh = create_unit_interval_mesh(self.parameters.initial_embedded_refinement);
        let mut embedded = EmbeddedSpace::from_mesh(embedded_mesh.clone(), self.parameters.embedded_fe_degree)?;
        let embedded_dofs = embedded.distribute();
        info!("embedded dofs: {}", embedded_dofs);

        let deformation_space = EmbeddedSpace::from_mesh(embedded_mesh, self.parameters.deformation_fe_degree)?;
        let mapper = DeformationMap::interpolate(
            deformation_space,
            &self.configuration_function,
            self.parameters.deformation_kind(),
        )?;

        refine_around_embedded(&mut host, &embedded, &mapper, self.parameters.delta_refinement)?;
        info!("embedding dofs: {}", host.num_dofs()?);

        validate_geometry(&host, &mapper)?;

        let mut constraints = ConstraintSet::new();
        make_hanging_node_constraints(&host, &mut constraints)?;
        make_zero_dirichlet_constraints(&host, &self.parameters.homogeneous_dirichlet_ids, &mut constraints)?;
        constraints.close();
        info!("constrained dofs: {}", constraints.num_constraints());

        self.host = Some(host);
        self.embedded = Some(embedded);
        self.mapper = Some(mapper);
        self.constraints = Some(constraints);
        self.state = RunState::GridReady;
        info!("setup grids and dofs: {:.3} s", timer.elapsed().as_secs_f64());
        Ok(())
    }

    /// Predicts the coupling operator sparsity between the two frozen
    /// discretizations.
    pub fn setup_coupling(&mut self) -> Result<(), RunError> {
        self.expect_state(RunState::GridReady)?;
        let timer = Instant::now();

        let host = self.host.as_ref().expect("state GridReady implies host");
        let embedded = self.embedded.as_ref().expect("state GridReady implies embedded");
        let mapper = self.mapper.as_ref().expect("state GridReady implies mapper");

        let locator = CellLocator::from_mesh(host.mesh());
        let assembler = CouplingAssembler::new(self.parameters.coupling_quadrature_order);
        let pattern = assembler.build_sparsity(host, embedded, mapper, &locator)?;

        self.locator = Some(locator);
        self.coupling_pattern = Some(pattern);
        self.state = RunState::CouplingReady;
        info!("setup coupling: {:.3} s", timer.elapsed().as_secs_f64());
        Ok(())
    }

    /// Assembles the stiffness operator, the coupling operator and the
    /// embedded target vectors from the frozen discretization state.
    pub fn assemble_system(&mut self) -> Result<(), RunError> {
        self.expect_state(RunState::CouplingReady)?;
        let timer = Instant::now();

        let host = self.host.as_ref().expect("state CouplingReady implies host");
        let embedded = self.embedded.as_ref().expect("state CouplingReady implies embedded");
        let mapper = self.mapper.as_ref().expect("state CouplingReady implies mapper");
        let constraints = self.constraints.as_ref().expect("state CouplingReady implies constraints");
        let locator = self.locator.as_ref().expect("state CouplingReady implies locator");
        let pattern = self
            .coupling_pattern
            .take()
            .expect("state CouplingReady implies coupling pattern");

        self.stiffness = Some(assemble_stiffness(host, constraints)?);

        let assembler = CouplingAssembler::new(self.parameters.coupling_quadrature_order);
        self.coupling = Some(assembler.assemble(pattern, host, embedded, mapper, locator)?);

        self.target_rhs = Some(assemble_target_rhs(embedded, mapper, &self.value_function)?);
        self.target_values = Some(interpolate_target(embedded, mapper, &self.value_function)?);

        self.state = RunState::Assembled;
        info!("assemble system: {:.3} s", timer.elapsed().as_secs_f64());
        Ok(())
    }

    /// Factorizes the stiffness operator and solves the saddle-point system
    /// through the Schur complement.
    pub fn solve(&mut self) -> Result<(), RunError> {
        self.expect_state(RunState::Assembled)?;
        let timer = Instant::now();

        let stiffness = self.stiffness.as_ref().expect("state Assembled implies stiffness");
        let coupling = self.coupling.as_ref().expect("state Assembled implies coupling");
        let target_rhs = self.target_rhs.as_ref().expect("state Assembled implies target rhs");
        let constraints = self.constraints.as_ref().expect("state Assembled implies constraints");

        let stiffness_inverse = FactorizedStiffness::factor(stiffness)?;
        let schur = SchurComplement::new(coupling, &stiffness_inverse);
        let cg = solve_cg(&schur, target_rhs, &self.parameters.schur_solver_control)?;

        let multiplier = cg.solution;
        let mut solution = stiffness_inverse.solve(&spmv(coupling, &multiplier));
        constraints.distribute(&mut solution);

        self.cg_iterations = cg.iterations;
        self.solution = Some(solution);
        self.multiplier = Some(multiplier);
        self.state = RunState::Solved;
        info!("solve: {:.3} s", timer.elapsed().as_secs_f64());
        Ok(())
    }

    /// Writes the host solution field and the embedded multiplier and target
    /// fields into the working directory.
    pub fn output(&mut self) -> Result<(), RunError> {
        self.export_fields(Path::new("embedding.vtu"), Path::new("embedded.vtu"))?;
        self.state = RunState::Exported;
        Ok(())
    }

    /// Exports the solved fields to the given paths.
    ///
    /// Export is a pure function of the solved state: exporting twice
    /// produces identical files. Only valid in the `Solved` or `Exported`
    /// states.
    pub fn export_fields(&self, host_path: &Path, embedded_path: &Path) -> Result<(), RunError> {
        if self.state != RunState::Solved && self.state != RunState::Exported {
            return Err(ConfigurationError::PhaseOrder {
                expected: RunState::Solved.name(),
                actual: self.state.name(),
            }
            .into());
        }
        let timer = Instant::now();

        let host = self.host.as_ref().expect("state Solved implies host");
        let embedded = self.embedded.as_ref().expect("state Solved implies embedded");
        let mapper = self.mapper.as_ref().expect("state Solved implies mapper");
        let solution = self.solution.as_ref().expect("state Solved implies solution");
        let multiplier = self.multiplier.as_ref().expect("state Solved implies multiplier");
        let target_values = self.target_values.as_ref().expect("state Solved implies target values");

        FieldDataSetBuilder::from_quad_mesh(host.mesh())
            .with_title("embedding space solution")
            .with_point_scalars("solution", solution.as_slice())
            .try_export(host_path)?;

        // The embedded polyline is drawn through the physical images of the
        // mesh vertices; vertex dofs come first in the embedded numbering.
        let positions = mapper.map_support_points(embedded)?;
        FieldDataSetBuilder::from_polyline(
            positions[..embedded.mesh().vertices().len()].to_vec(),
            embedded.mesh().connectivity(),
        )
        .with_title("embedded space fields")
        .with_point_scalars("lambda", multiplier.as_slice())
        .with_point_scalars("g", target_values.as_slice())
        .try_export(embedded_path)?;

        info!("output results: {:.3} s", timer.elapsed().as_secs_f64());
        Ok(())
    }
}
