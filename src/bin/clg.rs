fn main() {
    std::process::exit(clg::cli::run(std::env::args_os()));
}
