use std::process::ExitCode;

fn main() -> ExitCode {
    slackbridge_cli::run()
}
