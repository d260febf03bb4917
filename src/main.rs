fn main() {
    if let Err(err) = sheet_insight::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
