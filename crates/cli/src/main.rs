use std::process::ExitCode;

fn main() -> ExitCode {
    skillbot_cli::run()
}
