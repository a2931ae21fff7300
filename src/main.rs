//! davtls command line entry point

use std::process::ExitCode;

use clap::Parser;
use davtls::certificate::OpensslGenerator;
use davtls::cli::{Cli, PROGRAM_NAME};
use davtls::observability::init_observability;
use davtls::paths::PathPrettifier;
use davtls::provision::Provisioner;
use davtls::trust::TrustRegistrar;
use davtls::Result;
use tracing::info;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{PROGRAM_NAME}: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let request = cli.request()?;
    init_observability(request.verbose);

    let prettifier = PathPrettifier::from_env();
    let generator = OpensslGenerator::new(&cli.openssl);
    let registrar = TrustRegistrar::new(davtls_truststore::native(), &prettifier);
    let provisioner = Provisioner::new(&request, &prettifier, &generator, registrar);

    let plan = provisioner.plan(&cli.overrides())?;
    let outcome = provisioner.run(&plan)?;

    info!(
        certificate_generated = outcome.certificate_generated,
        tls_configured = outcome.tls_configured,
        trusted = outcome.trusted,
        "🎉 Done"
    );
    Ok(())
}
