fn main() {
    if let Err(err) = classcode::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
