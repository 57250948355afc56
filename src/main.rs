use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use minicov::cli;
use minicov::engine::JacocoCliEngine;

/// Generate minimal JSON reports by reading exec and Java class files.
#[derive(Parser)]
#[command(name = "minicov", version, about)]
struct Cli {
    /// JaCoCo *.exec files to read.
    #[arg(value_name = "EXECFILES", required = true)]
    exec_files: Vec<PathBuf>,

    /// Location of Java class files (files, directories or jars).
    #[arg(long = "classfiles", value_name = "PATH", required = true, num_args = 1..)]
    class_files: Vec<PathBuf>,

    /// Output file for the JSON report.
    #[arg(long, value_name = "FILE")]
    json: PathBuf,

    /// Path to jacococli.jar, used to analyze the class files.
    #[arg(long, env = "JACOCO_CLI", value_name = "JAR")]
    jacoco_cli: PathBuf,

    /// Java executable used to run jacococli.jar.
    #[arg(long, env = "JAVA", default_value = "java", value_name = "EXE")]
    java: PathBuf,

    /// Log progress to stderr (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = JacocoCliEngine::new(&cli.java, &cli.jacoco_cli);
    let out = cli::cmd_report(&engine, &cli.exec_files, &cli.class_files, &cli.json)?;
    print!("{out}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "minicov=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
