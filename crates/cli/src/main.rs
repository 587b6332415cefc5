use std::process::ExitCode;

fn main() -> ExitCode {
    budtender_cli::run()
}
