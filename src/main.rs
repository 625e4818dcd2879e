fn main() {
    if let Err(err) = archd::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
