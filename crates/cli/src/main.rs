use std::process::ExitCode;

fn main() -> ExitCode {
    harvestdesk_cli::run()
}
