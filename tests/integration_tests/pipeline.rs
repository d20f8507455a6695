use std::fs;

use fictus::config::Parameters;
use fictus::error::{ConfigurationError, GeometryValidationError, RunError};
use fictus::mesh::procedural::create_unit_square_quad_mesh;
use fictus::problem::{DistributedLagrangeProblem, RunState};

/// The reference scenario: unit-square host, circular embedded curve of
/// radius 0.3 centred at (0.4, 0.4), homogeneous Dirichlet on all four host
/// boundary ids, target value g ≡ 1.
fn scenario_parameters() -> Parameters {
    let mut parameters = Parameters::default();
    parameters.initial_refinement = 4;
    parameters.initial_embedded_refinement = 5;
    parameters.delta_refinement = 0;
    parameters.initialized = true;
    parameters
}

fn solved_problem(parameters: Parameters) -> DistributedLagrangeProblem {
    let mut problem = DistributedLagrangeProblem::new(parameters).unwrap();
    problem.setup_grids().unwrap();
    problem.setup_coupling().unwrap();
    problem.assemble_system().unwrap();
    problem.solve().unwrap();
    problem
}

#[test]
fn end_to_end_scenario_converges_with_consistent_shapes() {
    let parameters = scenario_parameters();
    let max_steps = parameters.schur_solver_control.max_steps;
    let problem = solved_problem(parameters);

    assert_eq!(problem.state(), RunState::Solved);
    assert!(problem.cg_iterations() > 0);
    assert!(problem.cg_iterations() < max_steps);

    let host_dofs = problem.host().unwrap().num_dofs().unwrap();
    let embedded_dofs = problem.embedded().unwrap().num_dofs().unwrap();
    // 2^4 + 1 vertices per direction in the host, 2^5 segments and their
    // 2^5 + 1 vertices in the embedded interval.
    assert_eq!(host_dofs, 17 * 17);
    assert_eq!(embedded_dofs, 33);

    let solution = problem.solution().unwrap();
    let multiplier = problem.multiplier().unwrap();
    assert_eq!(solution.len(), host_dofs);
    assert_eq!(multiplier.len(), embedded_dofs);

    let coupling = problem.coupling().unwrap();
    assert_eq!(coupling.nrows(), host_dofs);
    assert_eq!(coupling.ncols(), embedded_dofs);

    // The multiplier is approximately constant along the curve, bounded by
    // discretization error.
    let mean = multiplier.mean();
    assert!(mean.abs() > 0.0);
    let variation = multiplier
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        .sqrt()
        / (multiplier.len() as f64).sqrt()
        / mean.abs();
    assert!(
        variation < 0.5,
        "multiplier varies too strongly: coefficient of variation {}",
        variation
    );
    assert!(multiplier.iter().all(|value| value.signum() == mean.signum()));
}

#[test]
fn repeated_runs_are_deterministic() {
    let first = solved_problem(scenario_parameters());
    let second = solved_problem(scenario_parameters());

    assert_eq!(first.solution().unwrap(), second.solution().unwrap());
    assert_eq!(first.multiplier().unwrap(), second.multiplier().unwrap());
}

#[test]
fn zero_delta_refinement_leaves_the_host_mesh_untouched() {
    let parameters = scenario_parameters();
    let expected_cells = create_unit_square_quad_mesh(parameters.initial_refinement).num_cells();

    let mut problem = DistributedLagrangeProblem::new(parameters).unwrap();
    problem.setup_grids().unwrap();
    assert_eq!(problem.host().unwrap().mesh().num_cells(), expected_cells);
}

#[test]
fn coarse_embedded_grids_fail_geometry_validation_before_assembly() {
    // 4x4 host cells have diameter sqrt(2)/4 ≈ 0.354; four chords of the
    // radius-0.3 circle are ≈ 0.424 long.
    let mut parameters = scenario_parameters();
    parameters.initial_refinement = 2;
    parameters.initial_embedded_refinement = 2;

    let mut problem = DistributedLagrangeProblem::new(parameters).unwrap();
    let error = problem.setup_grids().unwrap_err();
    assert!(matches!(
        error,
        RunError::Geometry(GeometryValidationError::EmbeddedTooCoarse { .. })
    ));

    // No assembly is reachable from the failed state.
    assert_eq!(problem.state(), RunState::Unconfigured);
    assert!(matches!(
        problem.assemble_system().unwrap_err(),
        RunError::Configuration(ConfigurationError::PhaseOrder { .. })
    ));
}

#[test]
fn delta_refinement_produces_a_balanced_nonconforming_solve() {
    let mut parameters = scenario_parameters();
    parameters.initial_refinement = 3;
    parameters.initial_embedded_refinement = 6;
    parameters.delta_refinement = 2;

    let problem = solved_problem(parameters);

    // Refinement happened around the curve only.
    let cells = problem.host().unwrap().mesh().num_cells();
    assert!(cells > 64, "no local refinement happened");
    assert!(cells < 4 * 4 * 64, "refinement was not local");

    let solution = problem.solution().unwrap();
    assert_eq!(solution.len(), problem.host().unwrap().num_dofs().unwrap());
    assert!(solution.iter().all(|value| value.is_finite()));
}

#[test]
fn phases_out_of_order_fail_fast() {
    let mut problem = DistributedLagrangeProblem::new(scenario_parameters()).unwrap();
    assert!(matches!(
        problem.setup_coupling().unwrap_err(),
        RunError::Configuration(ConfigurationError::PhaseOrder { .. })
    ));
    assert!(matches!(
        problem.solve().unwrap_err(),
        RunError::Configuration(ConfigurationError::PhaseOrder { .. })
    ));

    problem.setup_grids().unwrap();
    assert!(matches!(
        problem.setup_grids().unwrap_err(),
        RunError::Configuration(ConfigurationError::PhaseOrder { .. })
    ));
}

#[test]
fn export_is_idempotent() {
    let mut parameters = scenario_parameters();
    parameters.initial_refinement = 3;
    parameters.initial_embedded_refinement = 4;
    let problem = solved_problem(parameters);

    let dir = std::env::temp_dir();
    let host_first = dir.join("fictus_host_first.vtu");
    let embedded_first = dir.join("fictus_embedded_first.vtu");
    let host_second = dir.join("fictus_host_second.vtu");
    let embedded_second = dir.join("fictus_embedded_second.vtu");

    problem.export_fields(&host_first, &embedded_first).unwrap();
    problem.export_fields(&host_second, &embedded_second).unwrap();

    assert_eq!(fs::read(&host_first).unwrap(), fs::read(&host_second).unwrap());
    assert_eq!(fs::read(&embedded_first).unwrap(), fs::read(&embedded_second).unwrap());

    for path in [host_first, embedded_first, host_second, embedded_second] {
        fs::remove_file(path).ok();
    }
}

#[test]
fn solution_approaches_the_target_inside_the_curve() {
    // With g ≡ 1 enforced on the circle and zero boundary values, the host
    // field near the curve's center approaches 1.
    let problem = solved_problem(scenario_parameters());
    let host = problem.host().unwrap();
    let solution = problem.solution().unwrap();
    let support_points = host.support_points().unwrap();

    let center_dof = support_points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (a.x - 0.4).powi(2) + (a.y - 0.4).powi(2);
            let db = (b.x - 0.4).powi(2) + (b.y - 0.4).powi(2);
            da.partial_cmp(&db).unwrap()
        })
        .map(|(dof, _)| dof)
        .unwrap();
    let center_value = solution[center_dof];
    assert!(
        (center_value - 1.0).abs() < 0.1,
        "field at the curve center is {}, expected close to 1",
        center_value
    );

    let boundary_dof = support_points.iter().position(|p| p.x == 0.0 && p.y == 0.0).unwrap();
    assert!(solution[boundary_dof].abs() < 1e-12);
}
