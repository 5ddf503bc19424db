use std::env;
use std::error::Error;
use std::process::ExitCode;

use neardup::{FsImageSource, JobConfig, run_job};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode, Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Some(root) = env::args().nth(1) else {
        eprintln!("usage: neardup <image-directory> [config.yaml]");
        return Ok(ExitCode::FAILURE);
    };
    let cfg = match env::args().nth(2) {
        Some(path) => JobConfig::from_file(&path)?,
        None => JobConfig::default().with_dry_run(true),
    };

    let source = FsImageSource::new(&root);
    let result = run_job(&cfg, &source)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}
