fn main() {
    if let Err(err) = flowc::driver::run_compiler() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
