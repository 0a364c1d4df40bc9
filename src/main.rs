fn main() {
    if let Err(e) = copilot_resolver::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
