use std::process::ExitCode;

fn main() -> ExitCode {
    rtbkit_pipeline_cli::run()
}
