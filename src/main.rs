fn main() {
    std::process::exit(scan_export::cli::run());
}
