//! gdtrans command-line binary

fn main() -> anyhow::Result<()> {
    gdtrans::cli::run_cli()
}
