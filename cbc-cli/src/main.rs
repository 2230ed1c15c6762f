//! CBC CLI - builds constrained-head lake boundary conditions from CDEC
//! reservoir data and the groundwater model's input files.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "cbc-cli",
    version,
    about = "Constrained-head lake boundary condition builder"
)]
struct Cli {
    #[command(subcommand)]
    command: cbc_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cbc_cmd::run(cli.command).await
}
