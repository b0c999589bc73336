fn main() {
    if let Err(err) = journey_sankey::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
