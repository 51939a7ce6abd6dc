fn main() {
    if let Err(err) = strata_cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
