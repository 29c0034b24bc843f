use std::process::ExitCode;

fn main() -> ExitCode {
    t3ext_cli::run()
}
