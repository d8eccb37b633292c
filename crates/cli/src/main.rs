use std::process::ExitCode;

fn main() -> ExitCode {
    delaymine_cli::run()
}
