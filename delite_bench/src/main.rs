use anyhow::Result;
use delite_bench::cli;

fn main() -> Result<()> {
    cli::handle_calls()
}
