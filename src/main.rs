use std::env;
use std::process::ExitCode;

use eyre::{eyre, Report};

use fictus::config::Parameters;
use fictus::problem::DistributedLagrangeProblem;

const DEFAULT_PARAMETER_FILE: &str = "parameters.json";

fn try_main() -> eyre::Result<()> {
    let mut args = env::args().skip(1);
    let parameter_file = args.next().unwrap_or_else(|| DEFAULT_PARAMETER_FILE.to_string());
    if let Some(extra) = args.next() {
        return Err(eyre!(
            "unexpected argument '{}'; usage: fictus [parameter-file]",
            extra
        ));
    }

    let parameters = Parameters::load_from_file(&parameter_file)?;
    env_logger::Builder::new()
        .filter_level(parameters.level_filter())
        .try_init()
        .ok();

    let mut problem = DistributedLagrangeProblem::new(parameters)?;
    problem.run()?;
    Ok(())
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            print_diagnostic(&report);
            ExitCode::FAILURE
        }
    }
}

fn print_diagnostic(report: &Report) {
    eprintln!();
    eprintln!("----------------------------------------------------");
    eprintln!("Exception on processing:");
    eprintln!("  {:#}", report);
    eprintln!("Aborting!");
    eprintln!("----------------------------------------------------");
}
