fn main() {
    if let Err(err) = field_sleuth::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
