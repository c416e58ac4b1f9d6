fn main() {
    if let Err(err) = slide_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
