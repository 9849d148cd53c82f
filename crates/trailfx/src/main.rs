mod cli;
mod paths;
mod run;
mod scripted;

use anyhow::Result;
use cli::Command;
use paths::AppPaths;
use run::Session;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved trailfx paths");

    match cli.command {
        Some(Command::Where) => {
            run::print_where(&paths);
            Ok(())
        }
        Some(Command::Init(args)) => run::init(&cli.options, &paths, &args),
        Some(Command::Params) => run::print_params(&Session::resolve(&cli.options, &paths)?),
        Some(Command::Render(args)) => {
            let session = Session::resolve(&cli.options, &paths)?;
            run::render(&session, &args)
        }
        None => run::preview(Session::resolve(&cli.options, &paths)?),
    }
}
