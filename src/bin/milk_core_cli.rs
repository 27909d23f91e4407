use milk_core::cli;

fn main() {
    milk_core::init();

    if let Err(err) = cli::run_cli() {
        cli::output::error(err);
        std::process::exit(1);
    }
}
