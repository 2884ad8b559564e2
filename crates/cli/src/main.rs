use std::process::ExitCode;

fn main() -> ExitCode {
    taskmate_cli::run()
}
