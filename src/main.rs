//! ef - command-line host for eventforge.

use eventforge::cli::{self, Cli};
use eventforge::ui::output;

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    if let Err(err) = cli::run(cli) {
        output::error(output::format_error_chain(&err));
        std::process::exit(1);
    }
}

/// `--debug` raises the default filter to `debug`; `RUST_LOG` overrides both.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}
