//! Env command implementation

use crate::commands::TraceArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use lumen_tracer::gate::ENABLE_COLLECTION_VAR;

#[derive(Args, Debug)]
pub struct EnvArgs {
    #[command(flatten)]
    pub trace: TraceArgs,

    /// Prefix each assignment with `export`
    #[arg(long)]
    pub export: bool,
}

pub fn run(args: EnvArgs) -> Result<()> {
    let options = args.trace.to_options();
    options.validate().context("Invalid tracing flags")?;

    let vars = options.to_env();
    if vars.is_empty() {
        output::warning("No tracing flags given, nothing will be collected");
        return Ok(());
    }

    let prefix = if args.export { "export " } else { "" };
    for line in assignments(&vars, prefix) {
        println!("{}", line);
    }

    if options.conditional_collection {
        output::info(&format!(
            "Collection starts once {}=1 is set in the traced process",
            ENABLE_COLLECTION_VAR
        ));
    }
    Ok(())
}

fn assignments(vars: &[(String, String)], prefix: &str) -> Vec<String> {
    vars.iter()
        .map(|(key, value)| format!("{}{}={}", prefix, key, value))
        .collect()
}
